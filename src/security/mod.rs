mod path;


pub use path::{PathSanitizer, Resolved, SandboxResolver, VirtualPath};
