use serde::{Deserialize, Serialize};

pub const DEFAULT_DELIVERY_CHARGE: i64 = 50;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub created_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub price: f64,
    pub half_price: Option<f64>,
    pub serves: Option<String>,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub is_veg: bool,
    pub created_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub price: f64,
    pub half_price: Option<f64>,
    pub serves: Option<String>,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub is_veg: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub half_price: Option<f64>,
    pub serves: Option<String>,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub is_veg: bool,
}

/// A product joined with its owning category, as used by the flattened
/// admin search index.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IndexedProduct {
    pub category_id: String,
    pub category_name: Option<String>,
    pub product: Product,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Portion {
    Full,
    Half,
}

impl Portion {
    pub fn label(&self) -> &'static str {
        match self {
            Portion::Full => "Full",
            Portion::Half => "Half",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    Pickup,
    Delivery,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub portion: Portion,
    pub quantity: i64,
    pub serves: Option<String>,
    pub is_veg: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub notes: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CartTotals {
    pub subtotal: f64,
    pub delivery_charge: Option<i64>,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VegFilter {
    All,
    Veg,
    NonVeg,
}

impl CartItem {
    /// Snapshot of a product at add time. Cart lines keep these values even
    /// when the product is edited later.
    pub fn capture(
        product: &Product,
        portion: Portion,
        quantity: i64,
        serves: Option<String>,
    ) -> CartItem {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price_for(portion),
            portion,
            quantity,
            serves: serves.or_else(|| product.serves_options().into_iter().next()),
            is_veg: product.is_veg,
            image_url: product.image_urls.first().cloned(),
        }
    }
}

impl Product {
    /// Price for the chosen portion. A missing (or zero) half price falls
    /// back to half the full price.
    pub fn price_for(&self, portion: Portion) -> f64 {
        match portion {
            Portion::Full => self.price,
            Portion::Half => match self.half_price {
                Some(p) if p > 0.0 => p,
                _ => self.price / 2.0,
            },
        }
    }

    /// The serves descriptor may hold several comma-separated options.
    pub fn serves_options(&self) -> Vec<String> {
        self.serves
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.name.to_lowercase().contains(&q)
            || self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&q))
                .unwrap_or(false)
    }
}

pub fn filter_products(products: Vec<Product>, filter: VegFilter) -> Vec<Product> {
    match filter {
        VegFilter::All => products,
        VegFilter::Veg => products.into_iter().filter(|p| p.is_veg).collect(),
        VegFilter::NonVeg => products.into_iter().filter(|p| !p.is_veg).collect(),
    }
}

/// Trim, collapse internal whitespace and title-case each word. Applied to
/// category names on every write, so stored names are uniformly formatted.
pub fn format_category_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
