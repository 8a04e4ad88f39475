mod walk;

pub use self::walk::{is_hidden, Walker, THUMBNAILS_DIR};
