// Tool catalogue
//
// A closed, declarative table mapping tool names to backend request shapes.
// The same table renders the LLM function declarations and validates the
// arguments the model produces, so the two can never drift apart.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::llm::ToolDeclaration;

/// HTTP verb of a backend endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl BackendMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendMethod::Get => "GET",
            BackendMethod::Post => "POST",
            BackendMethod::Put => "PUT",
            BackendMethod::Delete => "DELETE",
        }
    }
}

/// Where an argument lands in the backend request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgIn {
    /// Substituted into the `{placeholder}` of the path template
    Path,
    /// Projected into the JSON body
    Body,
}

/// Argument value constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Any integer
    Integer,
    /// Integer ≥ 0
    Count,
    /// Integer ≥ 1
    PositiveCount,
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM`, 24-hour
    Time,
    /// One of a closed set of strings
    OneOf(&'static [&'static str]),
}

impl ArgKind {
    fn json_type(self) -> &'static str {
        match self {
            ArgKind::Integer | ArgKind::Count | ArgKind::PositiveCount => "integer",
            ArgKind::Date | ArgKind::Time | ArgKind::OneOf(_) => "string",
        }
    }
}

/// One declared argument of a tool
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub location: ArgIn,
    pub description: &'static str,
}

/// One entry of the closed tool table
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub method: BackendMethod,
    /// Path template with positional `{placeholder}` substitution
    pub path: &'static str,
    pub args: &'static [ArgSpec],
}

/// Schema violation detail, fed back to the model as a structured result
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ArgError(pub String);

const RESERVATION_STATUSES: &[&str] = &["PENDING", "CONFIRMED", "CANCELED"];

macro_rules! arg {
    ($name:literal, $kind:expr, $required:expr, $location:expr, $desc:literal) => {
        ArgSpec {
            name: $name,
            kind: $kind,
            required: $required,
            location: $location,
            description: $desc,
        }
    };
}

static CATALOGUE: &[ToolSpec] = &[
    ToolSpec {
        name: "rooms_list",
        description: "Get the list of all hotel rooms with details (type, price, capacity, amenities)",
        method: BackendMethod::Get,
        path: "/api/v1/rooms",
        args: &[],
    },
    ToolSpec {
        name: "rooms_get",
        description: "Get detailed information about a specific hotel room by its ID",
        method: BackendMethod::Get,
        path: "/api/v1/rooms/{id}",
        args: &[arg!("id", ArgKind::Integer, true, ArgIn::Path, "Room ID")],
    },
    ToolSpec {
        name: "rooms_filter",
        description: "Find rooms available for a stay period that can accommodate the requested guests",
        method: BackendMethod::Post,
        path: "/api/v1/rooms/filter",
        args: &[
            arg!("checkInDate", ArgKind::Date, true, ArgIn::Body, "Check-in date, YYYY-MM-DD"),
            arg!("checkOutDate", ArgKind::Date, true, ArgIn::Body, "Check-out date, YYYY-MM-DD"),
            arg!("numberOfAdults", ArgKind::PositiveCount, true, ArgIn::Body, "Number of adult guests, minimum 1"),
            arg!("numberOfChildren", ArgKind::Count, true, ArgIn::Body, "Number of children, 0 or more"),
        ],
    },
    ToolSpec {
        name: "reservations_list",
        description: "List the guest's room reservations",
        method: BackendMethod::Get,
        path: "/api/v1/reservations",
        args: &[],
    },
    ToolSpec {
        name: "reservations_get",
        description: "Get a room reservation by its ID",
        method: BackendMethod::Get,
        path: "/api/v1/reservations/{id}",
        args: &[arg!("id", ArgKind::Integer, true, ArgIn::Path, "Reservation ID")],
    },
    ToolSpec {
        name: "reservations_create",
        description: "Create a room reservation; returns the reservation with ID, status and total price",
        method: BackendMethod::Post,
        path: "/api/v1/reservations",
        args: &[
            arg!("roomId", ArgKind::Integer, true, ArgIn::Body, "ID of the room to reserve"),
            arg!("checkInDate", ArgKind::Date, true, ArgIn::Body, "Check-in date, YYYY-MM-DD"),
            arg!("checkOutDate", ArgKind::Date, true, ArgIn::Body, "Check-out date, YYYY-MM-DD"),
            arg!("numberOfAdults", ArgKind::PositiveCount, true, ArgIn::Body, "Number of adult guests, minimum 1"),
            arg!("numberOfChildren", ArgKind::Count, true, ArgIn::Body, "Number of children, 0 or more"),
        ],
    },
    ToolSpec {
        name: "reservations_update",
        description: "Update a room reservation (partial update, all fields except ID optional)",
        method: BackendMethod::Put,
        path: "/api/v1/reservations/{id}",
        args: &[
            arg!("id", ArgKind::Integer, true, ArgIn::Path, "Reservation ID"),
            arg!("checkInDate", ArgKind::Date, false, ArgIn::Body, "New check-in date, YYYY-MM-DD"),
            arg!("checkOutDate", ArgKind::Date, false, ArgIn::Body, "New check-out date, YYYY-MM-DD"),
            arg!("numberOfAdults", ArgKind::PositiveCount, false, ArgIn::Body, "New number of adult guests"),
            arg!("numberOfChildren", ArgKind::Count, false, ArgIn::Body, "New number of children"),
            arg!("status", ArgKind::OneOf(RESERVATION_STATUSES), false, ArgIn::Body, "New reservation status"),
        ],
    },
    ToolSpec {
        name: "reservations_cancel",
        description: "Cancel a room reservation by its ID",
        method: BackendMethod::Delete,
        path: "/api/v1/reservations/{id}",
        args: &[arg!("id", ArgKind::Integer, true, ArgIn::Path, "Reservation ID to cancel")],
    },
    ToolSpec {
        name: "restaurant_menu",
        description: "Get the hotel restaurant menu",
        method: BackendMethod::Get,
        path: "/api/v1/restaurant/menu",
        args: &[],
    },
    ToolSpec {
        name: "restaurant_table_list",
        description: "List the guest's restaurant table reservations",
        method: BackendMethod::Get,
        path: "/api/v1/restaurant/reservations",
        args: &[],
    },
    ToolSpec {
        name: "restaurant_table_get",
        description: "Get a restaurant table reservation by its ID",
        method: BackendMethod::Get,
        path: "/api/v1/restaurant/reservations/{id}",
        args: &[arg!("id", ArgKind::Integer, true, ArgIn::Path, "Table reservation ID")],
    },
    ToolSpec {
        name: "restaurant_table_create",
        description: "Reserve a restaurant table for a date, time and number of guests",
        method: BackendMethod::Post,
        path: "/api/v1/restaurant/reservations",
        args: &[
            arg!("date", ArgKind::Date, true, ArgIn::Body, "Reservation date, YYYY-MM-DD"),
            arg!("time", ArgKind::Time, true, ArgIn::Body, "Reservation time, HH:MM (e.g. 19:30)"),
            arg!("guests", ArgKind::PositiveCount, true, ArgIn::Body, "Number of guests, minimum 1"),
        ],
    },
    ToolSpec {
        name: "restaurant_table_update",
        description: "Update a restaurant table reservation (partial update, all fields except ID optional)",
        method: BackendMethod::Put,
        path: "/api/v1/restaurant/reservations/{id}",
        args: &[
            arg!("id", ArgKind::Integer, true, ArgIn::Path, "Table reservation ID"),
            arg!("date", ArgKind::Date, false, ArgIn::Body, "New reservation date, YYYY-MM-DD"),
            arg!("time", ArgKind::Time, false, ArgIn::Body, "New reservation time, HH:MM"),
            arg!("guests", ArgKind::PositiveCount, false, ArgIn::Body, "New number of guests"),
            arg!("status", ArgKind::OneOf(RESERVATION_STATUSES), false, ArgIn::Body, "New reservation status"),
        ],
    },
    ToolSpec {
        name: "restaurant_table_cancel",
        description: "Cancel a restaurant table reservation by its ID",
        method: BackendMethod::Delete,
        path: "/api/v1/restaurant/reservations/{id}",
        args: &[arg!("id", ArgKind::Integer, true, ArgIn::Path, "Table reservation ID to cancel")],
    },
];

/// The full closed catalogue
pub fn catalogue() -> &'static [ToolSpec] {
    CATALOGUE
}

/// Table lookup by tool name
pub fn find_tool(name: &str) -> Option<&'static ToolSpec> {
    CATALOGUE.iter().find(|spec| spec.name == name)
}

/// Render the catalogue as LLM function declarations
pub fn declarations() -> Vec<ToolDeclaration> {
    CATALOGUE.iter().map(ToolSpec::declaration).collect()
}

impl ToolSpec {
    /// JSON schema for this tool's arguments object
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for arg in self.args {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(arg.kind.json_type()));
            prop.insert("description".into(), json!(arg.description));
            if let ArgKind::OneOf(values) = arg.kind {
                prop.insert("enum".into(), json!(values));
            }
            properties.insert(arg.name.to_string(), Value::Object(prop));
            if arg.required {
                required.push(arg.name);
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Function declaration handed to the model
    pub fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap())
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap())
}

/// Validate model-produced arguments against a tool's declared schema
///
/// Unknown fields are tolerated; declared fields are checked for presence
/// (when required) and for their value constraint.
pub fn validate_args(spec: &ToolSpec, args: &Value) -> Result<(), ArgError> {
    let object = args
        .as_object()
        .ok_or_else(|| ArgError("arguments must be a JSON object".into()))?;

    for arg in spec.args {
        let value = match object.get(arg.name) {
            Some(v) if !v.is_null() => v,
            _ if arg.required => {
                return Err(ArgError(format!("missing required field '{}'", arg.name)));
            }
            _ => continue,
        };
        check_kind(arg.name, arg.kind, value)?;
    }
    Ok(())
}

fn check_kind(name: &str, kind: ArgKind, value: &Value) -> Result<(), ArgError> {
    match kind {
        ArgKind::Integer => {
            value
                .as_i64()
                .ok_or_else(|| ArgError(format!("'{name}' must be an integer")))?;
        }
        ArgKind::Count => {
            let n = value
                .as_i64()
                .ok_or_else(|| ArgError(format!("'{name}' must be an integer")))?;
            if n < 0 {
                return Err(ArgError(format!("'{name}' must be 0 or more")));
            }
        }
        ArgKind::PositiveCount => {
            let n = value
                .as_i64()
                .ok_or_else(|| ArgError(format!("'{name}' must be an integer")))?;
            if n < 1 {
                return Err(ArgError(format!("'{name}' must be at least 1")));
            }
        }
        ArgKind::Date => {
            let s = value
                .as_str()
                .ok_or_else(|| ArgError(format!("'{name}' must be a string")))?;
            if !date_re().is_match(s) {
                return Err(ArgError(format!("'{name}' must match YYYY-MM-DD")));
            }
        }
        ArgKind::Time => {
            let s = value
                .as_str()
                .ok_or_else(|| ArgError(format!("'{name}' must be a string")))?;
            if !time_re().is_match(s) {
                return Err(ArgError(format!("'{name}' must match HH:MM")));
            }
        }
        ArgKind::OneOf(allowed) => {
            let s = value
                .as_str()
                .ok_or_else(|| ArgError(format!("'{name}' must be a string")))?;
            if !allowed.contains(&s) {
                return Err(ArgError(format!(
                    "'{name}' must be one of {}",
                    allowed.join(", ")
                )));
            }
        }
    }
    Ok(())
}
