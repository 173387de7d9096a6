//! Catalog tools exposed to the search role.
//!
//! Tools are the only capabilities the search role can invoke; each wraps one
//! catalog operation. Failures are rendered with the `Error:` prefix
//! convention so they travel in-band through the exchange instead of
//! aborting it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::CatalogClient;

/// Abstract base trait for exchange tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls.
    fn name(&self) -> &str;

    /// Description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for tool parameters.
    fn parameters(&self) -> Value;

    /// Execute the tool with given parameters.
    ///
    /// Returns the result as a string; failures use the `Error: ...` form.
    async fn execute(&self, params: HashMap<String, Value>) -> String;

    /// Convert tool to OpenAI function schema format.
    fn to_schema(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            }
        })
    }
}

/// Registry for exchange tools.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// The fixed registry backing the search exchange: keyword search,
    /// paginated listing, and by-id lookup against one catalog client.
    pub fn with_catalog(client: CatalogClient, page_limit: u32) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchProductsTool {
            client: client.clone(),
            default_limit: page_limit,
        }));
        registry.register(Box::new(GetAllProductsTool {
            client: client.clone(),
            default_limit: page_limit,
        }));
        registry.register(Box::new(GetProductTool { client }));
        registry
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool definitions in OpenAI format.
    pub fn get_definitions(&self) -> Vec<Value> {
        self.tools.values().map(|tool| tool.to_schema()).collect()
    }

    /// Execute a tool by name with given parameters.
    ///
    /// Unknown tools produce an in-band `Error:` string, same as tool-level
    /// failures, so the calling role always gets a result to react to.
    pub async fn execute(&self, name: &str, params: HashMap<String, Value>) -> String {
        match self.tools.get(name) {
            Some(tool) => tool.execute(params).await,
            None => format!("Error: Tool '{}' not found", name),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn u32_param(params: &HashMap<String, Value>, key: &str, default: u32) -> u32 {
    params
        .get(key)
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .unwrap_or(default)
}

// ---------------------------------------------------------------------------
// search_products
// ---------------------------------------------------------------------------

/// Keyword search against the catalog.
struct SearchProductsTool {
    client: CatalogClient,
    default_limit: u32,
}

#[async_trait]
impl Tool for SearchProductsTool {
    fn name(&self) -> &str {
        "search_products"
    }

    fn description(&self) -> &str {
        "Search for products by keyword query. Returns products with id, title, \
         brand, price, rating, category, availability, and discount."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Short keyword query, e.g. 'phone'"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum products per page (default 30)"
                },
                "skip": {
                    "type": "integer",
                    "description": "Offset for pagination (default 0)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> String {
        let query = match params.get("query").and_then(Value::as_str) {
            Some(q) if !q.trim().is_empty() => q.trim().to_string(),
            _ => return "Error: 'query' parameter is required".to_string(),
        };
        let limit = u32_param(&params, "limit", self.default_limit);
        let skip = u32_param(&params, "skip", 0);

        match self.client.search(&query, limit, skip).await {
            Ok(result) => serde_json::to_string(&result)
                .unwrap_or_else(|e| format!("Error: failed to encode search result: {}", e)),
            Err(e) => format!("Error: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// get_all_products
// ---------------------------------------------------------------------------

/// Full catalog listing with pagination handled internally.
struct GetAllProductsTool {
    client: CatalogClient,
    default_limit: u32,
}

#[async_trait]
impl Tool for GetAllProductsTool {
    fn name(&self) -> &str {
        "get_all_products"
    }

    fn description(&self) -> &str {
        "Get all available products with pagination. Parameters: limit (page \
         size, default 30), skip (starting offset, default 0)."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "Page size used while paging (default 30)"
                },
                "skip": {
                    "type": "integer",
                    "description": "Starting offset (default 0)"
                }
            }
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> String {
        let limit = u32_param(&params, "limit", self.default_limit);
        let skip = u32_param(&params, "skip", 0);

        match self.client.get_all(limit, skip).await {
            Ok(products) => {
                let payload = serde_json::json!({
                    "products": products,
                    "total": products.len(),
                });
                payload.to_string()
            }
            Err(e) => format!("Error: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// get_product
// ---------------------------------------------------------------------------

/// Single-product lookup by id.
struct GetProductTool {
    client: CatalogClient,
}

#[async_trait]
impl Tool for GetProductTool {
    fn name(&self) -> &str {
        "get_product"
    }

    fn description(&self) -> &str {
        "Get complete details for a specific product by its ID."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "integer",
                    "description": "Product ID"
                }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> String {
        let id = match params.get("id").and_then(Value::as_i64) {
            Some(id) => id,
            None => return "Error: 'id' parameter is required".to_string(),
        };

        match self.client.get_by_id(id).await {
            Ok(product) => serde_json::to_string(&product)
                .unwrap_or_else(|e| format!("Error: failed to encode product: {}", e)),
            Err(e) => format!("Error: {}", e),
        }
    }
}
