use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(RecordId);
id_newtype!(ProductId);

impl RecordId {
    /// Zero is what the API hands back for records it never persisted.
    pub fn usable(id: Option<RecordId>) -> Option<RecordId> {
        id.filter(|id| id.0 != 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Users,
    Products,
    Categories,
}

impl ResourceKind {
    pub fn path(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Products => "products",
            Self::Categories => "categories",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Self::Users => "user",
            Self::Products => "product",
            Self::Categories => "category",
        }
    }

    pub fn plural(self) -> &'static str {
        self.path()
    }
}

/// A record type served by one collection endpoint.
pub trait Resource: Clone + Send + Sync + DeserializeOwned + 'static {
    type Draft: Draft;

    const KIND: ResourceKind;

    fn id(&self) -> Option<RecordId>;
}

/// Payload for create/update calls.
pub trait Draft: Serialize + Send + Sync {
    /// Trims text fields and rejects drafts missing a required field.
    fn prepare(self) -> Result<Self, ValidationError>
    where
        Self: Sized;
}

fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub role: String,
}

impl Draft for UserDraft {
    fn prepare(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required("name", self.name)?,
            email: required("email", self.email)?,
            role: required("role", self.role)?,
        })
    }
}

impl Resource for User {
    type Draft = UserDraft;

    const KIND: ResourceKind = ResourceKind::Users;

    fn id(&self) -> Option<RecordId> {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub title: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Draft for ProductDraft {
    fn prepare(self) -> Result<Self, ValidationError> {
        let title = required("title", self.title)?;
        let category = required("category", self.category)?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::InvalidField {
                field: "price",
                reason: "must be a non-negative amount".into(),
            });
        }
        Ok(Self {
            title,
            price: self.price,
            category,
            description: self.description.trim().to_string(),
            image: self
                .image
                .map(|image| image.trim().to_string())
                .filter(|image| !image.is_empty()),
        })
    }
}

impl Resource for Product {
    type Draft = ProductDraft;

    const KIND: ResourceKind = ResourceKind::Products;

    fn id(&self) -> Option<RecordId> {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
}

impl Draft for CategoryDraft {
    fn prepare(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required("name", self.name)?,
        })
    }
}

impl Resource for Category {
    type Draft = CategoryDraft;

    const KIND: ResourceKind = ResourceKind::Categories;

    fn id(&self) -> Option<RecordId> {
        self.id
    }
}

/// One product line in the local cart mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: f64,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}
