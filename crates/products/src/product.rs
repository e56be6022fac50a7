use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricedesk_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, Event};
use pricedesk_currency::CurrencyCode;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    company_id: Option<CompanyId>,
    sku: String,
    name: String,
    list_price: Decimal,
    currency: Option<CurrencyCode>,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            company_id: None,
            sku: String::new(),
            name: String::new(),
            list_price: Decimal::ZERO,
            currency: None,
            version: 0,
            created: false,
        }
    }

    /// Rebuild a product from its event history.
    pub fn from_events<'a>(
        id: ProductId,
        events: impl IntoIterator<Item = &'a ProductEvent>,
    ) -> Self {
        let mut product = Self::empty(id);
        for event in events {
            product.apply(event);
        }
        product
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sales price before any pricelist applies, in `currency()`.
    pub fn list_price(&self) -> Decimal {
        self.list_price
    }

    pub fn currency(&self) -> Option<&CurrencyCode> {
        self.currency.as_ref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub list_price: Decimal,
    /// Usually the company currency.
    pub currency: CurrencyCode,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeListPrice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeListPrice {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub list_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    ChangeListPrice(ChangeListPrice),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub list_price: Decimal,
    pub currency: CurrencyCode,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ListPriceChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPriceChanged {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub previous_price: Decimal,
    pub list_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ListPriceChanged(ListPriceChanged),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ListPriceChanged(_) => "products.product.list_price_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ListPriceChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.company_id = Some(e.company_id);
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.list_price = e.list_price;
                self.currency = Some(e.currency.clone());
                self.created = true;
            }
            ProductEvent::ListPriceChanged(e) => {
                self.list_price = e.list_price;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::ChangeListPrice(cmd) => self.handle_change_list_price(cmd),
        }
    }
}

impl Product {
    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        Ok(())
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        if cmd.list_price.is_sign_negative() {
            return Err(DomainError::validation("list price cannot be negative"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            company_id: cmd.company_id,
            product_id: cmd.product_id,
            sku: cmd.sku.clone(),
            name: cmd.name.clone(),
            list_price: cmd.list_price,
            currency: cmd.currency.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_list_price(
        &self,
        cmd: &ChangeListPrice,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("product {}", cmd.product_id)));
        }
        self.ensure_company(cmd.company_id)?;
        self.ensure_product_id(cmd.product_id)?;

        if cmd.list_price.is_sign_negative() {
            return Err(DomainError::validation("list price cannot be negative"));
        }
        if cmd.list_price == self.list_price {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::ListPriceChanged(ListPriceChanged {
            company_id: cmd.company_id,
            product_id: cmd.product_id,
            previous_price: self.list_price,
            list_price: cmd.list_price,
            occurred_at: cmd.occurred_at,
        })])
    }
}
