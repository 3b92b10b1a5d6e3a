use serde::{Deserialize, Serialize};

/// 作用在单位四边形上的 2D 仿射变换（先旋转，再缩放，最后平移）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    pub scale: f32,
    pub rotation: f32,
    pub translate: [f32; 2],
}

impl Transform {
    pub fn new(scale: f32, rotation: f32, translate: [f32; 2]) -> Self {
        Self {
            scale,
            rotation,
            translate,
        }
    }

    /// 背面朝上的静止状态：不缩放、不旋转、不平移。
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, [0.0, 0.0])
    }

    /// 展开为列主序的 3x3 矩阵，供 `uniformMatrix3fv` 直接使用。
    ///
    /// 线性部分为 [[s·cosθ, s·sinθ], [-s·sinθ, s·cosθ]]，第三列是平移。
    pub fn to_mat3(&self) -> [f32; 9] {
        let (sin, cos) = self.rotation.sin_cos();
        let s = self.scale;
        [
            s * cos,
            s * sin,
            0.0,
            -s * sin,
            s * cos,
            0.0,
            self.translate[0],
            self.translate[1],
            1.0,
        ]
    }

    /// 将变换应用到一个点上（与 `to_mat3` 的矩阵乘法等价）。
    pub fn apply(&self, point: [f32; 2]) -> [f32; 2] {
        let m = self.to_mat3();
        [
            m[0] * point[0] + m[3] * point[1] + m[6],
            m[1] * point[0] + m[4] * point[1] + m[7],
        ]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
