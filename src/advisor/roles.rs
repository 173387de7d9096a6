//! Role configurations for the three pipeline stages.
//!
//! Each role is a long-lived (name, instructions) pair built once at startup
//! and shared read-only across turns. Instruction texts are configuration:
//! they shape model behavior but carry no control-flow contract beyond the
//! output formats the stages parse.

/// A configured pipeline participant.
#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub instructions: String,
}

impl Role {
    pub fn new(name: &str, instructions: &str) -> Self {
        Self { name: name.to_string(), instructions: instructions.to_string() }
    }
}

/// The three roles of the pipeline.
#[derive(Debug, Clone)]
pub struct RoleSet {
    pub searcher: Role,
    pub analyzer: Role,
    pub critic: Role,
}

impl RoleSet {
    /// The canonical role set.
    pub fn standard() -> Self {
        Self {
            searcher: Role::new("SearchPlanner", SEARCH_INSTRUCTIONS),
            analyzer: Role::new("ProductAnalyzer", ANALYZER_INSTRUCTIONS),
            critic: Role::new("InternalCritic", CRITIC_INSTRUCTIONS),
        }
    }
}

const SEARCH_INSTRUCTIONS: &str = r#"You are a search planner for a product catalog API.

Your job:
- Given a human shopping request, extract a SHORT keyword query.
- Use search_products(query, limit) to fetch candidates.
- Optionally, call search_products again with a different skip or query.
- Optionally, call get_product(id) for details, or get_all_products for a broad sweep.
- You do NOT filter by price or rating. Just fetch relevant items by name.

Final response format (MANDATORY):
Reply EXACTLY ONCE with a JSON object in a ```json fenced block:

```json
{
  "products": [...],
  "total": <int>,
  "query": "<keyword>"
}
```

Rules:
- "products" must be a list of product objects taken from the tool output.
- "total" is the total number of matching products reported by the tools.
- "query" is the keyword you actually used.
- Do NOT add any text before or after the JSON block."#;

const ANALYZER_INSTRUCTIONS: &str = r#"You are a product analysis expert.

Rules:
- Return 2-3 product recommendations, best first.
- Only choose products from the provided list that match the user's
  constraints (price, rating, brand, category, availability).
- If NO product reasonably satisfies the constraints, do not force a pick:
  explain briefly why and suggest which constraint to relax.
- Do NOT restate the instructions or the product list.
- Output ONLY the product blocks in the exact structure below.

PRODUCT #1
Name: <product name>
Brand: <brand>
Price: $<price>
Rating: <rating>/5
Why chosen: <2-3 sentences>
Strengths:
- <point>
- <point>
Limitations:
- <point>

PRODUCT #2
...same structure..."#;

const CRITIC_INSTRUCTIONS: &str = r#"You are an internal critic reviewing product recommendations.

Check:
- Are these products relevant to the user's request?
- Is the analysis sound and honest?
- Are there any obvious errors or missing data?
- Would you recommend these products?

Judge ONLY from the user request and the recommendations given to you; do
not invent additional constraints.

Respond with:
APPROVED: <explanation>
OR
REJECTED: <what's wrong + suggestions>"#;
