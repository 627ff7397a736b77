// ==========================================
// FFE 规格项跟踪系统 - 国际化
// ==========================================
// 职责: 状态显示名与工作流提示的多语言文本
// 词条: locales/zh-CN.yml（默认）、locales/en.yml
// 注意: rust_i18n::i18n! 宏在 lib.rs 中初始化
// ==========================================

use crate::domain::types::SpecStatus;

pub const SUPPORTED_LOCALES: [&str; 2] = ["zh-CN", "en"];

pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 切换语言；不支持的语言代码被忽略并返回 false
pub fn set_locale(locale: &str) -> bool {
    if !SUPPORTED_LOCALES.contains(&locale) {
        tracing::warn!(locale = %locale, "不支持的语言,保持当前设置");
        return false;
    }
    rust_i18n::set_locale(locale);
    true
}

/// 翻译词条
///
/// ```no_run
/// let msg = ffe_spec_tracker::i18n::t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译词条并替换 `%{name}` 占位符
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(t(key), |text, (name, value)| {
        text.replace(&format!("%{{{}}}", name), value)
    })
}

/// 状态显示名
///
/// 存储值（含历史别名）先归一化；无法识别时原样返回
pub fn display_label(raw: &str) -> String {
    match SpecStatus::normalize(raw) {
        Some(status) => t(&status.label_key()),
        None => raw.to_string(),
    }
}
