//! Tool definitions: parameters, routes and result shapes
//!
//! A `ToolSpec` describes one GhidraMCP operation the model may request.

use serde::{Deserialize, Serialize};

/// How a parameter value is interpreted before it reaches the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Free text, passed through unchanged
    #[default]
    String,
    /// Decimal or 0x-prefixed integer, re-rendered in decimal
    Integer,
    /// Program address, canonicalized to bare hex digits
    Address,
}

impl ParamKind {
    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "string" | "str" | "text" => Some(Self::String),
            "integer" | "int" | "number" => Some(Self::Integer),
            "address" | "addr" => Some(Self::Address),
            _ => None,
        }
    }
}

/// Shape of a successful tool payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultShape {
    /// One block of text (decompiled code, rename confirmations)
    #[default]
    Text,
    /// One entry per line (function lists, segments)
    Lines,
    /// A JSON document
    Json,
}

impl ResultShape {
    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "lines" | "list" => Some(Self::Lines),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// HTTP verb used for a tool route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }
}

/// Where a tool lives on the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub method: HttpMethod,
    /// Path relative to the endpoint base URL, without a leading slash
    pub path: String,
    /// POST the single argument value as the raw body instead of a form
    #[serde(default)]
    pub raw_body: bool,
}

impl Route {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            raw_body: false,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            raw_body: false,
        }
    }

    /// POST route whose body is the bare value of its one parameter
    pub fn post_raw(path: impl Into<String>) -> Self {
        Self {
            raw_body: true,
            ..Self::post(path)
        }
    }
}

/// One parameter of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Canonical parameter name
    pub name: String,
    #[serde(default)]
    pub kind: ParamKind,
    #[serde(default)]
    pub required: bool,
    /// Alternative spellings models commonly use for this parameter
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Field name expected on the wire, when it differs from `name`
    #[serde(default)]
    pub wire_name: Option<String>,
}

impl ParamSpec {
    /// Required parameter
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            aliases: Vec::new(),
            wire_name: None,
        }
    }

    /// Optional parameter
    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    /// Add accepted aliases
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Set the wire field name
    pub fn with_wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    /// Name sent to the remote API
    pub fn wire(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }

    /// Check whether `key` names this parameter, directly or by alias
    pub fn answers_to(&self, key: &str) -> bool {
        self.name == key || self.aliases.iter().any(|a| a == key)
    }
}

/// A registry entry: one operation of the remote tool API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Canonical snake_case name (unique key)
    pub name: String,
    pub description: String,
    /// Ordered parameter list; positional arguments bind in this order
    pub params: Vec<ParamSpec>,
    pub result: ResultShape,
    pub route: Route,
}

impl ToolSpec {
    /// Create a tool with no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>, route: Route) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            result: ResultShape::Text,
            route,
        }
    }

    /// Append a parameter
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Set the result shape
    pub fn with_result(mut self, result: ResultShape) -> Self {
        self.result = result;
        self
    }

    /// Look up a parameter by canonical name
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Required parameters, in declaration order
    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }

    /// Render as `name(a, b?)` for prompts
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                if p.required {
                    p.name.clone()
                } else {
                    format!("{}?", p.name)
                }
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_kind_parse() {
        assert_eq!(ParamKind::parse("string"), Some(ParamKind::String));
        assert_eq!(ParamKind::parse("INT"), Some(ParamKind::Integer));
        assert_eq!(ParamKind::parse("address"), Some(ParamKind::Address));
        assert_eq!(ParamKind::parse("float"), None);
    }

    #[test]
    fn test_result_shape_parse() {
        assert_eq!(ResultShape::parse("lines"), Some(ResultShape::Lines));
        assert_eq!(ResultShape::parse("json"), Some(ResultShape::Json));
        assert_eq!(ResultShape::parse("table"), None);
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("POST"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse("PUT"), None);
    }

    #[test]
    fn test_param_answers_to_alias() {
        let param = ParamSpec::required("address", ParamKind::Address)
            .with_aliases(["function_address", "functionAddress"]);
        assert!(param.answers_to("address"));
        assert!(param.answers_to("functionAddress"));
        assert!(!param.answers_to("name"));
    }

    #[test]
    fn test_param_wire_name() {
        let plain = ParamSpec::required("address", ParamKind::Address);
        assert_eq!(plain.wire(), "address");

        let renamed = plain.clone().with_wire_name("function_address");
        assert_eq!(renamed.wire(), "function_address");
    }

    #[test]
    fn test_tool_signature() {
        let tool = ToolSpec::new("list_methods", "List methods", Route::get("methods"))
            .with_param(ParamSpec::optional("offset", ParamKind::Integer))
            .with_param(ParamSpec::optional("limit", ParamKind::Integer));
        assert_eq!(tool.signature(), "list_methods(offset?, limit?)");

        let tool = ToolSpec::new("decompile_function", "Decompile", Route::post("decompile"))
            .with_param(ParamSpec::required("name", ParamKind::String));
        assert_eq!(tool.signature(), "decompile_function(name)");
    }

    #[test]
    fn test_required_params() {
        let tool = ToolSpec::new("rename_data", "Rename data", Route::post("renameData"))
            .with_param(ParamSpec::required("address", ParamKind::Address))
            .with_param(ParamSpec::required("new_name", ParamKind::String))
            .with_param(ParamSpec::optional("comment", ParamKind::String));

        let required: Vec<&str> = tool.required_params().map(|p| p.name.as_str()).collect();
        assert_eq!(required, vec!["address", "new_name"]);
    }

    #[test]
    fn test_tool_serialization() {
        let tool = ToolSpec::new("list_functions", "List functions", Route::get("list_functions"))
            .with_result(ResultShape::Lines);
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("\"result\":\"lines\""));
        assert!(json.contains("\"method\":\"GET\""));
    }
}
