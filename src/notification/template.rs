//! 模板占位符替换
//!
//! 占位符格式为 `[[NAME]]`，名称取自任务元数据。
//! 无法解析的占位符原样保留。

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// 占位符 `[[NAME]]`
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([A-Za-z0-9_]+)\]\]").expect("Invalid placeholder regex")
});

/// 模板引擎 trait
pub trait TemplateEngine: Send + Sync {
    /// 用元数据替换模板中的占位符
    fn substitute(&self, template: &str, metadata: &BTreeMap<String, String>) -> String;
}

/// 默认占位符处理器
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderProcessor;

impl PlaceholderProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEngine for PlaceholderProcessor {
    fn substitute(&self, template: &str, metadata: &BTreeMap<String, String>) -> String {
        PLACEHOLDER_RE
            .replace_all(template, |caps: &Captures| match metadata.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
