mod format;
pub use format::*;

mod misc;
pub use misc::*;

mod definitions;
pub use definitions::*;

mod shader;
pub use shader::*;

mod vertex;
pub use vertex::*;
