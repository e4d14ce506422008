//! Tool catalogue: the built-in GhidraMCP surface plus TOML loading
//!
//! The registry is immutable once built and is shared between orchestrators
//! behind an `Arc`, so lookups need no locking.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{BridgeError, Result};

use super::definition::{HttpMethod, ParamKind, ParamSpec, ResultShape, Route, ToolSpec};

/// Aliases models use for a generic address parameter
pub const ADDRESS_ALIASES: [&str; 4] = ["function_address", "functionAddress", "addr", "func_address"];

/// TOML representation of a tool parameter
#[derive(Debug, Deserialize)]
struct TomlParam {
    name: String,
    kind: Option<String>,
    required: Option<bool>,
    #[serde(default)]
    aliases: Vec<String>,
    wire_name: Option<String>,
}

/// TOML representation of a tool definition
#[derive(Debug, Deserialize)]
struct TomlTool {
    name: String,
    #[serde(default)]
    description: String,
    method: Option<String>,
    path: Option<String>,
    #[serde(default)]
    raw_body: bool,
    result: Option<String>,
    #[serde(default, rename = "param")]
    params: Vec<TomlParam>,
}

/// TOML file structure
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(rename = "tool")]
    tools: Vec<TomlTool>,
}

/// Catalogue of known operations, keyed by canonical name
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry from tool specs, rejecting duplicate names
    pub fn from_specs(specs: impl IntoIterator<Item = ToolSpec>) -> Result<Self> {
        let mut registry = Self::default();
        for spec in specs {
            if registry.index.contains_key(&spec.name) {
                return Err(BridgeError::Registry(format!("Duplicate tool '{}'", spec.name)));
            }
            registry.index.insert(spec.name.clone(), registry.tools.len());
            registry.tools.push(spec);
        }
        Ok(registry)
    }

    /// Load a catalogue from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            BridgeError::Registry(format!(
                "Failed to read catalogue {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Load a catalogue from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let catalog: TomlCatalog = toml::from_str(content)?;
        let specs = catalog
            .tools
            .into_iter()
            .map(Self::convert_toml_tool)
            .collect::<Result<Vec<_>>>()?;
        let registry = Self::from_specs(specs)?;
        log::info!("Loaded tool catalogue with {} tools", registry.len());
        Ok(registry)
    }

    fn convert_toml_tool(tool: TomlTool) -> Result<ToolSpec> {
        let method = match tool.method.as_deref() {
            Some(m) => HttpMethod::parse(m).ok_or_else(|| {
                BridgeError::Registry(format!("Invalid method '{}' for tool '{}'", m, tool.name))
            })?,
            None => HttpMethod::Get,
        };
        let result = match tool.result.as_deref() {
            Some(r) => ResultShape::parse(r).ok_or_else(|| {
                BridgeError::Registry(format!("Invalid result shape '{}' for tool '{}'", r, tool.name))
            })?,
            None => ResultShape::Text,
        };
        if tool.raw_body && method != HttpMethod::Post {
            return Err(BridgeError::Registry(format!(
                "Tool '{}' sets raw_body on a GET route",
                tool.name
            )));
        }
        let path = tool.path.unwrap_or_else(|| tool.name.clone());

        let route = Route {
            method,
            path,
            raw_body: tool.raw_body,
        };
        let mut spec = ToolSpec::new(tool.name.clone(), tool.description, route)
            .with_result(result);

        for param in tool.params {
            let kind = match param.kind.as_deref() {
                Some(k) => ParamKind::parse(k).ok_or_else(|| {
                    BridgeError::Registry(format!(
                        "Invalid kind '{}' for parameter '{}' of tool '{}'",
                        k, param.name, tool.name
                    ))
                })?,
                None => ParamKind::String,
            };
            let mut p = if param.required.unwrap_or(false) {
                ParamSpec::required(param.name, kind)
            } else {
                ParamSpec::optional(param.name, kind)
            }
            .with_aliases(param.aliases);
            if let Some(wire) = param.wire_name {
                p = p.with_wire_name(wire);
            }
            spec = spec.with_param(p);
        }

        Ok(spec)
    }

    /// The GhidraMCP operations the bridge knows out of the box
    pub fn builtin() -> Self {
        let tools = builtin_specs();
        let mut index = HashMap::with_capacity(tools.len());
        for (i, tool) in tools.iter().enumerate() {
            index.insert(tool.name.clone(), i);
        }
        Self { tools, index }
    }

    /// Get a tool by canonical name
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in catalogue order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    /// All tools in catalogue order
    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render the catalogue as a bullet list for system prompts
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.signature(), t.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn address_param(required: bool) -> ParamSpec {
    let param = if required {
        ParamSpec::required("address", ParamKind::Address)
    } else {
        ParamSpec::optional("address", ParamKind::Address)
    };
    param.with_aliases(ADDRESS_ALIASES)
}

fn paging(spec: ToolSpec) -> ToolSpec {
    spec.with_param(ParamSpec::optional("offset", ParamKind::Integer))
        .with_param(ParamSpec::optional("limit", ParamKind::Integer))
        .with_result(ResultShape::Lines)
}

fn new_name() -> ParamSpec {
    ParamSpec::required("new_name", ParamKind::String).with_aliases(["newName", "new_function_name"])
}

fn builtin_specs() -> Vec<ToolSpec> {
    vec![
        paging(ToolSpec::new(
            "list_methods",
            "List all function names with pagination",
            Route::get("methods"),
        )),
        paging(ToolSpec::new(
            "list_classes",
            "List all namespace/class names with pagination",
            Route::get("classes"),
        )),
        ToolSpec::new(
            "decompile_function",
            "Decompile a specific function by name",
            Route::post_raw("decompile"),
        )
        .with_param(
            ParamSpec::required("name", ParamKind::String)
                .with_aliases(["function_name", "functionName", "function"]),
        ),
        ToolSpec::new("rename_function", "Rename a function by its current name", Route::post("renameFunction"))
            .with_param(
                ParamSpec::required("old_name", ParamKind::String)
                    .with_aliases(["oldName", "current_name"])
                    .with_wire_name("oldName"),
            )
            .with_param(new_name().with_wire_name("newName")),
        ToolSpec::new("rename_data", "Rename a data label at an address", Route::post("renameData"))
            .with_param(address_param(true))
            .with_param(new_name().with_wire_name("newName")),
        paging(ToolSpec::new(
            "list_segments",
            "List memory segments with pagination",
            Route::get("segments"),
        )),
        paging(ToolSpec::new(
            "list_imports",
            "List imported symbols with pagination",
            Route::get("imports"),
        )),
        paging(ToolSpec::new(
            "list_exports",
            "List exported symbols with pagination",
            Route::get("exports"),
        )),
        paging(ToolSpec::new(
            "list_namespaces",
            "List all non-global namespaces with pagination",
            Route::get("namespaces"),
        )),
        paging(ToolSpec::new(
            "list_data_items",
            "List defined data labels with pagination",
            Route::get("data"),
        )),
        paging(
            ToolSpec::new(
                "search_functions_by_name",
                "Search functions whose name contains a substring",
                Route::get("searchFunctions"),
            )
            .with_param(ParamSpec::required("query", ParamKind::String).with_aliases(["search", "pattern"])),
        ),
        ToolSpec::new("rename_variable", "Rename a local variable", Route::post("renameVariable"))
            .with_param(
                ParamSpec::required("function_name", ParamKind::String)
                    .with_aliases(["functionName", "function"])
                    .with_wire_name("functionName"),
            )
            .with_param(
                ParamSpec::required("old_name", ParamKind::String)
                    .with_aliases(["oldName", "variable_name"])
                    .with_wire_name("oldName"),
            )
            .with_param(new_name().with_wire_name("newName")),
        ToolSpec::new(
            "get_function_by_address",
            "Get the function containing an address",
            Route::get("get_function_by_address"),
        )
        .with_param(address_param(true)),
        ToolSpec::new(
            "get_current_address",
            "Get the address currently selected by the user",
            Route::get("get_current_address"),
        ),
        ToolSpec::new(
            "get_current_function",
            "Get the function currently selected by the user",
            Route::get("get_current_function"),
        ),
        ToolSpec::new("list_functions", "List all functions in the database", Route::get("list_functions"))
            .with_result(ResultShape::Lines),
        ToolSpec::new(
            "decompile_function_by_address",
            "Decompile the function at an address",
            Route::get("decompile_function"),
        )
        .with_param(address_param(true)),
        ToolSpec::new(
            "disassemble_function",
            "Get assembly code for the function at an address",
            Route::get("disassemble_function"),
        )
        .with_param(address_param(true))
        .with_result(ResultShape::Lines),
        ToolSpec::new(
            "set_decompiler_comment",
            "Set a comment at an address in the pseudocode",
            Route::post("set_decompiler_comment"),
        )
        .with_param(address_param(true))
        .with_param(ParamSpec::required("comment", ParamKind::String)),
        ToolSpec::new(
            "set_disassembly_comment",
            "Set a comment at an address in the disassembly",
            Route::post("set_disassembly_comment"),
        )
        .with_param(address_param(true))
        .with_param(ParamSpec::required("comment", ParamKind::String)),
        ToolSpec::new(
            "rename_function_by_address",
            "Rename the function at an address",
            Route::post("rename_function_by_address"),
        )
        .with_param(address_param(true).with_wire_name("function_address"))
        .with_param(new_name()),
        ToolSpec::new(
            "set_function_prototype",
            "Set the prototype of the function at an address",
            Route::post("set_function_prototype"),
        )
        .with_param(address_param(true).with_wire_name("function_address"))
        .with_param(ParamSpec::required("prototype", ParamKind::String)),
        ToolSpec::new(
            "set_local_variable_type",
            "Set the type of a local variable",
            Route::post("set_local_variable_type"),
        )
        .with_param(address_param(true).with_wire_name("function_address"))
        .with_param(ParamSpec::required("variable_name", ParamKind::String).with_aliases(["variableName"]))
        .with_param(ParamSpec::required("new_type", ParamKind::String).with_aliases(["newType", "type"])),
    ]
}
