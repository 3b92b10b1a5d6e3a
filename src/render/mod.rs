//! 卡牌渲染模块（2D 仿射变换与 WebGL 纯色四边形管线）。

pub mod quad;
pub mod transform;

pub use quad::{reveal_transform, QuadRenderer, RenderError, IDLE_COLOR};
pub use transform::Transform;
