//! Element locators.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How an element is located on a page.
///
/// Serializes to the W3C "find element" body, e.g.
/// `{"using": "css selector", "value": "p.hint"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "using", content = "value")]
pub enum Selector {
	#[serde(rename = "css selector")]
	Css(String),
	#[serde(rename = "xpath")]
	XPath(String),
	#[serde(rename = "tag name")]
	Tag(String),
}

impl Selector {
	pub fn css(value: impl Into<String>) -> Self {
		Self::Css(value.into())
	}

	pub fn xpath(value: impl Into<String>) -> Self {
		Self::XPath(value.into())
	}

	pub fn tag(value: impl Into<String>) -> Self {
		Self::Tag(value.into())
	}

	/// Locates by element id; WebDriver has no id strategy so this is a CSS id selector.
	pub fn id(value: &str) -> Self {
		Self::Css(format!("#{value}"))
	}

	/// Raw locator expression.
	pub fn value(&self) -> &str {
		match self {
			Self::Css(v) | Self::XPath(v) | Self::Tag(v) => v,
		}
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Css(v) => write!(f, "css={v}"),
			Self::XPath(v) => write!(f, "xpath={v}"),
			Self::Tag(v) => write!(f, "tag={v}"),
		}
	}
}
