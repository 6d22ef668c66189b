// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）和印尼文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// 语言由配置 ui.locale 决定, 按调用显式传入
// ==========================================

/// 已提供翻译的语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "id"];

/// 翻译消息（带参数, 指定语言）
///
/// # 示例
/// ```no_run
/// use shift_roster::i18n::t_with_args;
/// let msg = t_with_args("en", "checklist.locked", &[("time", "06:00")]);
/// ```
pub fn t_with_args(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key, locale = locale).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
