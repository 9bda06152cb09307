//! Search rules applied to recognized page text.
//!
//! 两种搜索方式：
//! - 标记行搜索：逐行查找包含标记字符串的行，保留页码
//! - 正则搜索：收集所有完整匹配，跨页去重

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// 搜索方式（可序列化，用于跨 worker 传递配置）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SearchMode {
    /// 字面子串，按行匹配
    Marker(String),
    /// 正则表达式，取完整匹配
    Regex(String),
}

impl SearchMode {
    pub fn compile(&self) -> Result<Search, RulesError> {
        match self {
            SearchMode::Marker(marker) => Ok(Search::Marker(marker.clone())),
            SearchMode::Regex(pattern) => compile_pattern(pattern).map(Search::Regex),
        }
    }
}

/// 编译后的搜索方式
#[derive(Debug, Clone)]
pub enum Search {
    Marker(String),
    Regex(Regex),
}

/// 标记行命中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineHit {
    /// 页码（已加上起始页偏移）
    pub page: u32,
    /// 去除首尾空白后的整行文本
    pub text: String,
}

/// 配置中的正则：单个字符串或字符串列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternList {
    One(String),
    Many(Vec<String>),
}

impl Default for PatternList {
    fn default() -> Self {
        PatternList::Many(Vec::new())
    }
}

impl PatternList {
    pub fn as_slice(&self) -> &[String] {
        match self {
            PatternList::One(pattern) => std::slice::from_ref(pattern),
            PatternList::Many(patterns) => patterns,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn compile(&self) -> Result<Vec<Regex>, RulesError> {
        self.as_slice().iter().map(|p| compile_pattern(p)).collect()
    }
}

pub fn compile_pattern(pattern: &str) -> Result<Regex, RulesError> {
    Regex::new(pattern).map_err(|source| RulesError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// 在每页文本中查找包含标记的行
///
/// `pages[i]` 对应页码 `start_page + i`。结果按页序、页内行序排列。
pub fn find_marker_lines<S: AsRef<str>>(pages: &[S], marker: &str, start_page: u32) -> Vec<LineHit> {
    let mut hits = Vec::new();
    for (offset, page_text) in pages.iter().enumerate() {
        let page = start_page + offset as u32;
        for line in page_text.as_ref().lines() {
            if line.contains(marker) {
                hits.push(LineHit {
                    page,
                    text: line.trim().to_string(),
                });
            }
        }
    }
    hits
}

/// 收集所有页面中正则的完整匹配（去空白、去空串、跨页去重）
pub fn find_regex_matches<S: AsRef<str>>(pages: &[S], regex: &Regex) -> BTreeSet<String> {
    pages
        .iter()
        .flat_map(|page_text| regex.find_iter(page_text.as_ref()))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 文本中第一个完整匹配
pub fn first_match<'t>(text: &'t str, regex: &Regex) -> Option<&'t str> {
    regex.find(text).map(|m| m.as_str())
}

/// 按顺序尝试候选正则，第一个命中的正则决定标识；结果已清洗为合法文件名
pub fn identifier_from_text(text: &str, patterns: &[Regex]) -> Option<String> {
    patterns
        .iter()
        .find_map(|regex| first_match(text, regex))
        .map(sanitize_file_stem)
}

const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// 将文件系统非法字符替换为下划线
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
