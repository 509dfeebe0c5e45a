//! Modification specs.
//!
//! Callers send the flat wire shape [`ModSpecInput`]; it is validated against
//! the registry once into a [`ModSpec`], whose [`FieldOp`] carries only the
//! data its category needs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BulkEditError;
use crate::registry::{Field, FieldCategory, FieldRegistry};

/// Arithmetic applied to a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericChange {
    Exact,
    IncreasePercent,
    DecreasePercent,
    IncreaseFixed,
    DecreaseFixed,
}

/// Price rounding policy. Only money fields honour anything but `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoundingMode {
    #[default]
    #[serde(rename = "none")]
    None,
    /// Floor, then `.99`.
    #[serde(rename = "round_99")]
    Round99,
    /// Floor, then `.95`.
    #[serde(rename = "round_95")]
    Round95,
    /// Nearest integer.
    #[serde(rename = "whole")]
    Whole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOp {
    Set(String),
    Prepend(String),
    Append(String),
    /// Literal, global replace. An empty `replace` deletes occurrences.
    FindReplace { find: String, replace: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOp {
    Add(String),
    Remove(String),
    Set(String),
}

/// A validated operation on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOp {
    Numeric {
        change: NumericChange,
        amount: Decimal,
        rounding: RoundingMode,
    },
    Text(TextOp),
    Tags(TagOp),
    Select(String),
}

/// A validated modification of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModSpec {
    pub field: Field,
    pub op: FieldOp,
}

/// The `type` of a wire modification spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Exact,
    IncreasePercent,
    DecreasePercent,
    IncreaseFixed,
    DecreaseFixed,
    Set,
    Prepend,
    Append,
    FindReplace,
    Add,
    Remove,
}

impl ChangeType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IncreasePercent => "increase_percent",
            Self::DecreasePercent => "decrease_percent",
            Self::IncreaseFixed => "increase_fixed",
            Self::DecreaseFixed => "decrease_fixed",
            Self::Set => "set",
            Self::Prepend => "prepend",
            Self::Append => "append",
            Self::FindReplace => "find_replace",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }

    /// Change types a field of this category accepts.
    #[must_use]
    pub const fn allowed_for(category: FieldCategory) -> &'static [Self] {
        match category {
            FieldCategory::Numeric => &[
                Self::Exact,
                Self::IncreasePercent,
                Self::DecreasePercent,
                Self::IncreaseFixed,
                Self::DecreaseFixed,
            ],
            FieldCategory::Text => &[Self::Set, Self::Prepend, Self::Append, Self::FindReplace],
            FieldCategory::Tags => &[Self::Add, Self::Remove, Self::Set],
            FieldCategory::Select => &[Self::Set],
        }
    }

    const fn numeric(self) -> Option<NumericChange> {
        match self {
            Self::Exact => Some(NumericChange::Exact),
            Self::IncreasePercent => Some(NumericChange::IncreasePercent),
            Self::DecreasePercent => Some(NumericChange::DecreasePercent),
            Self::IncreaseFixed => Some(NumericChange::IncreaseFixed),
            Self::DecreaseFixed => Some(NumericChange::DecreaseFixed),
            _ => None,
        }
    }
}

impl From<NumericChange> for ChangeType {
    fn from(change: NumericChange) -> Self {
        match change {
            NumericChange::Exact => Self::Exact,
            NumericChange::IncreasePercent => Self::IncreasePercent,
            NumericChange::DecreasePercent => Self::DecreasePercent,
            NumericChange::IncreaseFixed => Self::IncreaseFixed,
            NumericChange::DecreaseFixed => Self::DecreaseFixed,
        }
    }
}

/// Wire shape: `{ field, type, value, value2?, rounding? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModSpecInput {
    pub field: Field,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounding: Option<RoundingMode>,
}

impl ModSpecInput {
    #[must_use]
    pub fn new(field: Field, change_type: ChangeType, value: impl Into<String>) -> Self {
        Self {
            field,
            change_type,
            value: value.into(),
            value2: None,
            rounding: None,
        }
    }

    #[must_use]
    pub fn with_value2(mut self, value2: impl Into<String>) -> Self {
        self.value2 = Some(value2.into());
        self
    }

    #[must_use]
    pub const fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = Some(rounding);
        self
    }
}

impl ModSpec {
    /// Validate a wire spec against the registry.
    ///
    /// Rounding on a non-money field is normalised to [`RoundingMode::None`].
    /// Select values are normalised to the option's canonical spelling.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not editable, the change type does
    /// not fit the field's category, a required value is missing, or a value
    /// does not parse for the field.
    pub fn from_input(
        input: &ModSpecInput,
        registry: &FieldRegistry,
    ) -> Result<Self, BulkEditError> {
        let descriptor = registry.editable(input.field)?;
        let field = input.field;
        let invalid_type = || BulkEditError::InvalidChangeType {
            field,
            change_type: input.change_type.as_str().to_string(),
            category: descriptor.category,
        };

        let op = match descriptor.category {
            FieldCategory::Numeric => {
                let change = input.change_type.numeric().ok_or_else(invalid_type)?;
                let raw = input.value.trim();
                if raw.is_empty() {
                    return Err(BulkEditError::MissingValue(format!(
                        "{} on {field}",
                        input.change_type.as_str()
                    )));
                }
                let amount = raw.parse::<Decimal>().map_err(|_| BulkEditError::InvalidValue {
                    field,
                    value: input.value.clone(),
                })?;
                let rounding = if descriptor.money {
                    input.rounding.unwrap_or_default()
                } else {
                    RoundingMode::None
                };
                FieldOp::Numeric {
                    change,
                    amount,
                    rounding,
                }
            }
            FieldCategory::Text => FieldOp::Text(match input.change_type {
                ChangeType::Set => TextOp::Set(input.value.clone()),
                ChangeType::Prepend => TextOp::Prepend(input.value.clone()),
                ChangeType::Append => TextOp::Append(input.value.clone()),
                ChangeType::FindReplace => {
                    if input.value.is_empty() {
                        return Err(BulkEditError::MissingValue(format!("find_replace on {field}")));
                    }
                    TextOp::FindReplace {
                        find: input.value.clone(),
                        replace: input.value2.clone().unwrap_or_default(),
                    }
                }
                _ => return Err(invalid_type()),
            }),
            FieldCategory::Tags => FieldOp::Tags(match input.change_type {
                ChangeType::Set => TagOp::Set(input.value.clone()),
                ChangeType::Add | ChangeType::Remove if input.value.trim().is_empty() => {
                    return Err(BulkEditError::MissingValue(format!(
                        "{} on {field}",
                        input.change_type.as_str()
                    )));
                }
                ChangeType::Add => TagOp::Add(input.value.clone()),
                ChangeType::Remove => TagOp::Remove(input.value.clone()),
                _ => return Err(invalid_type()),
            }),
            FieldCategory::Select => {
                if input.change_type != ChangeType::Set {
                    return Err(invalid_type());
                }
                let option = descriptor
                    .options
                    .iter()
                    .find(|option| option.eq_ignore_ascii_case(input.value.trim()))
                    .ok_or_else(|| BulkEditError::InvalidValue {
                        field,
                        value: input.value.clone(),
                    })?;
                FieldOp::Select((*option).to_string())
            }
        };

        Ok(Self { field, op })
    }

    /// Validate a list of wire specs.
    ///
    /// # Errors
    ///
    /// Returns the first invalid spec's error.
    pub fn from_inputs(
        inputs: &[ModSpecInput],
        registry: &FieldRegistry,
    ) -> Result<Vec<Self>, BulkEditError> {
        inputs.iter().map(|input| Self::from_input(input, registry)).collect()
    }

    /// Convert back to the wire shape (for storage and display).
    #[must_use]
    pub fn to_input(&self) -> ModSpecInput {
        let (change_type, value, value2, rounding) = match &self.op {
            FieldOp::Numeric {
                change,
                amount,
                rounding,
            } => (
                ChangeType::from(*change),
                amount.to_string(),
                None,
                (*rounding != RoundingMode::None).then_some(*rounding),
            ),
            FieldOp::Text(TextOp::Set(v)) | FieldOp::Select(v) => {
                (ChangeType::Set, v.clone(), None, None)
            }
            FieldOp::Text(TextOp::Prepend(v)) => (ChangeType::Prepend, v.clone(), None, None),
            FieldOp::Text(TextOp::Append(v)) => (ChangeType::Append, v.clone(), None, None),
            FieldOp::Text(TextOp::FindReplace { find, replace }) => {
                (ChangeType::FindReplace, find.clone(), Some(replace.clone()), None)
            }
            FieldOp::Tags(TagOp::Add(v)) => (ChangeType::Add, v.clone(), None, None),
            FieldOp::Tags(TagOp::Remove(v)) => (ChangeType::Remove, v.clone(), None, None),
            FieldOp::Tags(TagOp::Set(v)) => (ChangeType::Set, v.clone(), None, None),
        };
        ModSpecInput {
            field: self.field,
            change_type,
            value,
            value2,
            rounding,
        }
    }

    /// Kind label recorded on each change this spec produces.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        ChangeKind::from(self.to_input().change_type)
    }
}

/// How a recorded change came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Exact,
    IncreasePercent,
    DecreasePercent,
    IncreaseFixed,
    DecreaseFixed,
    Set,
    Prepend,
    Append,
    FindReplace,
    Add,
    Remove,
    /// Produced by inverting an earlier change.
    Revert,
}

impl From<ChangeType> for ChangeKind {
    fn from(change_type: ChangeType) -> Self {
        match change_type {
            ChangeType::Exact => Self::Exact,
            ChangeType::IncreasePercent => Self::IncreasePercent,
            ChangeType::DecreasePercent => Self::DecreasePercent,
            ChangeType::IncreaseFixed => Self::IncreaseFixed,
            ChangeType::DecreaseFixed => Self::DecreaseFixed,
            ChangeType::Set => Self::Set,
            ChangeType::Prepend => Self::Prepend,
            ChangeType::Append => Self::Append,
            ChangeType::FindReplace => Self::FindReplace,
            ChangeType::Add => Self::Add,
            ChangeType::Remove => Self::Remove,
        }
    }
}
