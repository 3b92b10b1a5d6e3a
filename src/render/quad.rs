use std::fmt;

use wasm_bindgen::JsCast;
use web_sys::js_sys::Float32Array;
use web_sys::{
    HtmlCanvasElement, WebGlProgram, WebGlRenderingContext, WebGlShader, WebGlUniformLocation,
};

use super::transform::Transform;

/// 卡牌背面的中性灰。
pub const IDLE_COLOR: [f32; 3] = [0.5, 0.5, 0.5];
/// 清屏时的底色，翻开后的四边形会在其上显示出来。
const CLEAR_COLOR: [f32; 4] = [0.12, 0.12, 0.12, 1.0];

/// 翻开状态使用的变换；具体数值只求与静止状态肉眼可辨。
pub fn reveal_transform() -> Transform {
    Transform::new(0.9, 0.2, [0.0, 0.0])
}

const VERTEX_SRC: &str = r#"
attribute vec2 a_position;
uniform mat3 u_transform;
void main() {
    vec3 position = u_transform * vec3(a_position, 1.0);
    gl_Position = vec4(position.xy, 0.0, 1.0);
}
"#;

const FRAGMENT_SRC: &str = r#"
precision mediump float;
uniform vec3 u_color;
void main() {
    gl_FragColor = vec4(u_color, 1.0);
}
"#;

// 单位四边形：四个角固定在 NDC 的 (±1, ±1)，以 TRIANGLE_STRIP 绘制。
const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    ContextUnavailable,
    ShaderCompile { log: String },
    ProgramLink { log: String },
    ResourceAllocation { what: &'static str },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ContextUnavailable => write!(f, "webgl context unavailable"),
            RenderError::ShaderCompile { log } => write!(f, "shader compile failed: {log}"),
            RenderError::ProgramLink { log } => write!(f, "program link failed: {log}"),
            RenderError::ResourceAllocation { what } => write!(f, "failed to allocate {what}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// 针对单个画布的纯色四边形渲染管线。
///
/// 创建失败即代表这张卡的绘制能力缺失，调用方应把卡牌标记为禁用；
/// 创建成功后 `draw` 不再产生可恢复的错误。
pub struct QuadRenderer {
    gl: WebGlRenderingContext,
    program: WebGlProgram,
    transform_location: WebGlUniformLocation,
    color_location: WebGlUniformLocation,
}

impl QuadRenderer {
    pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, RenderError> {
        let gl = canvas
            .get_context("webgl")
            .map_err(|_| RenderError::ContextUnavailable)?
            .ok_or(RenderError::ContextUnavailable)?
            .dyn_into::<WebGlRenderingContext>()
            .map_err(|_| RenderError::ContextUnavailable)?;

        let vertex = compile_shader(&gl, WebGlRenderingContext::VERTEX_SHADER, VERTEX_SRC)?;
        let fragment = compile_shader(&gl, WebGlRenderingContext::FRAGMENT_SHADER, FRAGMENT_SRC)?;
        let program = link_program(&gl, &vertex, &fragment)?;

        let buffer = gl
            .create_buffer()
            .ok_or(RenderError::ResourceAllocation { what: "buffer" })?;
        gl.bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, Some(&buffer));
        let vertices = Float32Array::from(QUAD_VERTICES.as_slice());
        gl.buffer_data_with_array_buffer_view(
            WebGlRenderingContext::ARRAY_BUFFER,
            &vertices,
            WebGlRenderingContext::STATIC_DRAW,
        );

        let position = gl.get_attrib_location(&program, "a_position");
        if position < 0 {
            return Err(RenderError::ResourceAllocation {
                what: "a_position attribute",
            });
        }
        gl.vertex_attrib_pointer_with_i32(
            position as u32,
            2,
            WebGlRenderingContext::FLOAT,
            false,
            0,
            0,
        );
        gl.enable_vertex_attrib_array(position as u32);

        let transform_location = gl
            .get_uniform_location(&program, "u_transform")
            .ok_or(RenderError::ResourceAllocation {
                what: "u_transform uniform",
            })?;
        let color_location =
            gl.get_uniform_location(&program, "u_color")
                .ok_or(RenderError::ResourceAllocation {
                    what: "u_color uniform",
                })?;

        Ok(Self {
            gl,
            program,
            transform_location,
            color_location,
        })
    }

    /// 清空整个画布，再以给定颜色填充变换后的四边形。
    pub fn draw(&self, color: [f32; 3], transform: &Transform) {
        let gl = &self.gl;
        gl.clear_color(
            CLEAR_COLOR[0],
            CLEAR_COLOR[1],
            CLEAR_COLOR[2],
            CLEAR_COLOR[3],
        );
        gl.clear(WebGlRenderingContext::COLOR_BUFFER_BIT);

        gl.use_program(Some(&self.program));
        gl.uniform_matrix3fv_with_f32_array(
            Some(&self.transform_location),
            false,
            &transform.to_mat3(),
        );
        gl.uniform3f(Some(&self.color_location), color[0], color[1], color[2]);
        gl.draw_arrays(WebGlRenderingContext::TRIANGLE_STRIP, 0, 4);
    }

    /// 背面朝上的静止画面：恒等变换加中性灰。
    pub fn draw_idle(&self) {
        self.draw(IDLE_COLOR, &Transform::identity());
    }

    /// 翻开画面：卡牌真实颜色加与静止态可区分的变换。
    pub fn draw_revealed(&self, color: [f32; 3]) {
        self.draw(color, &reveal_transform());
    }
}

fn compile_shader(
    gl: &WebGlRenderingContext,
    kind: u32,
    source: &str,
) -> Result<WebGlShader, RenderError> {
    let shader = gl
        .create_shader(kind)
        .ok_or(RenderError::ResourceAllocation { what: "shader" })?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    let compiled = gl
        .get_shader_parameter(&shader, WebGlRenderingContext::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if compiled {
        Ok(shader)
    } else {
        Err(RenderError::ShaderCompile {
            log: gl
                .get_shader_info_log(&shader)
                .unwrap_or_else(|| "unknown shader error".to_string()),
        })
    }
}

fn link_program(
    gl: &WebGlRenderingContext,
    vertex: &WebGlShader,
    fragment: &WebGlShader,
) -> Result<WebGlProgram, RenderError> {
    let program = gl
        .create_program()
        .ok_or(RenderError::ResourceAllocation { what: "program" })?;
    gl.attach_shader(&program, vertex);
    gl.attach_shader(&program, fragment);
    gl.link_program(&program);

    let linked = gl
        .get_program_parameter(&program, WebGlRenderingContext::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);
    if linked {
        Ok(program)
    } else {
        Err(RenderError::ProgramLink {
            log: gl
                .get_program_info_log(&program)
                .unwrap_or_else(|| "unknown link error".to_string()),
        })
    }
}
