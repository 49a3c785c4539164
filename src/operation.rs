//! OpenAPI operation metadata for documented handlers.
//!
//! A [`Describe`] collects what a handler's author declares about it
//! (description, responses, parameters, request body, documentation text);
//! [`Operation::build`] turns that into an OpenAPI operation object.

use schemars::Schema;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::Result;
use crate::schema;

/// Media type used for JSON request and response bodies.
pub const APPLICATION_JSON: &str = "application/json";

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    Cookie,
    Header,
    #[default]
    Query,
    Path,
}

impl ParameterIn {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterIn::Cookie => "cookie",
            ParameterIn::Header => "header",
            ParameterIn::Query => "query",
            ParameterIn::Path => "path",
        }
    }
}

/// A named operation parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterIn,
    pub schema: Schema,
    /// Always true for path parameters.
    pub required: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, location: ParameterIn, schema: Schema) -> Self {
        Self {
            name: name.into(),
            location,
            schema,
            required: location == ParameterIn::Path,
        }
    }

    pub fn query(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, ParameterIn::Query, schema)
    }

    pub fn header(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, ParameterIn::Header, schema)
    }

    pub fn cookie(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, ParameterIn::Cookie, schema)
    }

    pub fn path(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, ParameterIn::Path, schema)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required || self.location == ParameterIn::Path;
        self
    }

    fn to_value(&self, defs: &mut Vec<(String, Value)>) -> Value {
        json!({
            "in": self.location.as_str(),
            "name": self.name,
            "schema": inline(&self.schema, defs),
            "required": self.required,
        })
    }
}

/// A JSON request body.
#[derive(Debug, Clone)]
pub struct RequestBody {
    pub description: String,
    pub schema: Schema,
    pub required: bool,
}

impl RequestBody {
    pub fn new(description: impl Into<String>, schema: Schema) -> Self {
        Self {
            description: description.into(),
            schema,
            required: false,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    fn to_value(&self, defs: &mut Vec<(String, Value)>) -> Value {
        let mut body = json!({
            "description": self.description,
            "content": {
                APPLICATION_JSON: { "schema": inline(&self.schema, defs) }
            },
        });
        // `required: false` is the OpenAPI default and is never written out
        if self.required {
            body["required"] = Value::Bool(true);
        }
        body
    }
}

/// A response for one status code.
#[derive(Debug, Clone)]
pub struct Response {
    pub description: String,
    pub content_type: String,
    pub status: u16,
    pub schema: Option<Schema>,
}

impl Response {
    /// A 200 response with the given content type and no schema.
    pub fn new(description: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            content_type: content_type.into(),
            status: 200,
            schema: None,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    fn to_value(&self, defs: &mut Vec<(String, Value)>) -> Value {
        let media = match &self.schema {
            Some(schema) => json!({ "schema": inline(schema, defs) }),
            None => json!({}),
        };
        let mut content = Map::new();
        content.insert(self.content_type.clone(), media);
        json!({
            "description": self.description,
            "content": content,
        })
    }
}

/// A response whose body is JSON described by `schema`.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub description: String,
    pub schema: Schema,
    pub status: u16,
}

impl JsonResponse {
    pub fn new(description: impl Into<String>, schema: Schema) -> Self {
        Self {
            description: description.into(),
            schema,
            status: 200,
        }
    }

    /// A JSON response whose schema is generated from `T`.
    pub fn of<T: schemars::JsonSchema>(description: impl Into<String>) -> Self {
        Self::new(description, schema::of::<T>())
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

impl From<JsonResponse> for Response {
    fn from(r: JsonResponse) -> Self {
        Response {
            description: r.description,
            content_type: APPLICATION_JSON.to_string(),
            status: r.status,
            schema: Some(r.schema),
        }
    }
}

/// Everything a handler declares about itself.
///
/// # Example
/// ```ignore
/// let describe = Describe::new("Fetch a pet")
///     .parameter(Parameter::path("id", schema::of::<u64>()))
///     .response(JsonResponse::of::<Pet>("The pet"))
///     .response(Response::new("No such pet", "text/plain").status(404));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Describe {
    description: String,
    responses: Vec<Response>,
    parameters: Option<Vec<Parameter>>,
    request_body: Option<RequestBody>,
    doc: Option<String>,
}

impl Describe {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn response(mut self, response: impl Into<Response>) -> Self {
        self.responses.push(response.into());
        self
    }

    pub fn responses<R: Into<Response>>(mut self, responses: impl IntoIterator<Item = R>) -> Self {
        self.responses.extend(responses.into_iter().map(Into::into));
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.get_or_insert_with(Vec::new).push(parameter);
        self
    }

    pub fn parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters
            .get_or_insert_with(Vec::new)
            .extend(parameters);
        self
    }

    pub fn request_body(mut self, request_body: RequestBody) -> Self {
        self.request_body = Some(request_body);
        self
    }

    /// Documentation text for the handler.
    ///
    /// Anything after a line starting with `---` is read as YAML and seeds the
    /// operation before the other declarations are applied.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// An OpenAPI operation object, plus the component schemas its inline schemas
/// refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    object: Map<String, Value>,
    schemas: Vec<(String, Value)>,
}

impl Operation {
    /// Build an operation from a declaration.
    ///
    /// Fails only when the documentation text carries YAML that does not
    /// parse into a mapping.
    pub fn build(describe: &Describe) -> Result<Self> {
        let mut operation = Operation {
            object: Map::new(),
            schemas: Vec::new(),
        };
        operation.apply(describe)?;
        Ok(operation)
    }

    /// Layer a declaration on top of this operation.
    ///
    /// Documentation YAML keys and a non-empty description, request body and
    /// parameters replace what is there; responses are merged by status code,
    /// the latest definition winning.
    pub fn apply(&mut self, describe: &Describe) -> Result<()> {
        if let Some(doc) = &describe.doc
            && let Some(seed) = from_doc(doc)?
        {
            self.seed(seed);
        }

        if !describe.description.is_empty() {
            self.object.insert(
                "description".into(),
                Value::String(describe.description.clone()),
            );
        }

        if let Some(request_body) = &describe.request_body {
            let value = request_body.to_value(&mut self.schemas);
            self.object.insert("requestBody".into(), value);
        }

        if let Some(parameters) = &describe.parameters {
            let values = parameters
                .iter()
                .map(|p| p.to_value(&mut self.schemas))
                .collect();
            self.object.insert("parameters".into(), Value::Array(values));
        }

        for response in &describe.responses {
            let value = response.to_value(&mut self.schemas);
            self.responses_mut().insert(response.status.to_string(), value);
        }

        // `responses` is required on every operation, even an empty one
        self.responses_mut();

        Ok(())
    }

    fn seed(&mut self, seed: Map<String, Value>) {
        for (key, value) in seed {
            match (key.as_str(), value) {
                ("responses", Value::Object(responses)) => {
                    let existing = self.responses_mut();
                    for (status, response) in responses {
                        existing.insert(status, response);
                    }
                }
                (_, value) => {
                    self.object.insert(key, value);
                }
            }
        }
    }

    fn responses_mut(&mut self) -> &mut Map<String, Value> {
        let entry = self
            .object
            .entry("responses")
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("responses was just set to an object"),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.object.get("description").and_then(Value::as_str)
    }

    /// Responses keyed by stringified status code.
    pub fn responses(&self) -> Option<&Map<String, Value>> {
        self.object.get("responses").and_then(Value::as_object)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.object.get(key)
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.object
    }

    /// Named schemas hoisted out of this operation's inline schemas.
    pub fn component_schemas(&self) -> &[(String, Value)] {
        &self.schemas
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.object.serialize(serializer)
    }
}

fn inline(schema: &Schema, defs: &mut Vec<(String, Value)>) -> Value {
    let (value, hoisted) = schema::hoist(schema);
    defs.extend(hoisted);
    value
}

/// Read the YAML block out of documentation text.
///
/// The block starts at the first line beginning with `---` and runs to the
/// end of the text. Returns `None` when there is no block or it is empty.
fn from_doc(doc: &str) -> Result<Option<Map<String, Value>>> {
    let lines: Vec<&str> = doc.lines().collect();
    let Some(start) = lines.iter().position(|l| l.trim().starts_with("---")) else {
        return Ok(None);
    };
    let block = &lines[start..];

    let indent = block
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    let yaml: String = block
        .iter()
        .map(|l| l.get(indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml)?;
    match yaml_to_json(parsed)? {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(malformed(format!(
            "expected a mapping of operation fields, found {other}"
        ))),
    }
}

fn malformed(msg: String) -> crate::Error {
    crate::Error::Yaml(<serde_yaml::Error as serde::de::Error>::custom(msg))
}

/// Convert YAML to JSON, stringifying scalar keys such as `200:`.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => serde_json::to_value(n)?,
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(
            seq.into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(malformed(format!("unsupported mapping key {other:?}"))),
                };
                map.insert(key, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}
