//! 浏览器侧的辅助工具（控制台日志）。

#[cfg(target_arch = "wasm32")]
pub fn log_warn(message: &str) {
    web_sys::console::warn_1(&wasm_bindgen::JsValue::from_str(message));
}

#[cfg(target_arch = "wasm32")]
pub fn log_error(message: &str) {
    web_sys::console::error_1(&wasm_bindgen::JsValue::from_str(message));
}

// 原生构建（本地测试）下退化为标准错误输出。
#[cfg(not(target_arch = "wasm32"))]
pub fn log_warn(message: &str) {
    eprintln!("warn: {message}");
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log_error(message: &str) {
    eprintln!("error: {message}");
}
