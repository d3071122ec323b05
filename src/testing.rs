//! Fakes and fixtures shared by unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Barrier;
use uuid::Uuid;

use crate::config::WorkflowSettings;
use crate::domain::{Category, Email, LineItem, NewProduct, Order, PaymentMethod, PhoneNumber, Product, Role, ShippingAddress, Unit, User};
use crate::notify::{EmailMessage, EmailSender, Notifier, NotifyError, SmsSender};
use crate::payment::{GatewayError, GatewayIntent, GatewayProvider, PaymentGateway, PaymentQuote, Settlement, SettlementProof};
use crate::store::{CatalogStore, MemoryStore, ProductFilter, StoreResult, Stores, UserStore};
use crate::workflow::OrderWorkflow;

#[derive(Default)]
pub struct FakeSms { fail: bool, sent: Mutex<Vec<(String, String)>> }

impl FakeSms {
    pub fn failing() -> Self { Self { fail: true, ..Default::default() } }
    pub fn sent(&self) -> Vec<(String, String)> { self.sent.lock().unwrap().clone() }
}

#[async_trait]
impl SmsSender for FakeSms {
    async fn send_sms(&self, to: &PhoneNumber, body: &str) -> Result<String, NotifyError> {
        if self.fail { return Err(NotifyError::Rejected { code: Some(21608), message: "unverified number".into() }); }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.as_str().to_string(), body.to_string()));
        Ok(format!("SM{}", sent.len()))
    }
}

#[derive(Default)]
pub struct FakeEmail { fail: bool, sent: Mutex<Vec<EmailMessage>> }

impl FakeEmail {
    pub fn failing() -> Self { Self { fail: true, ..Default::default() } }
    pub fn sent(&self) -> Vec<EmailMessage> { self.sent.lock().unwrap().clone() }
}

#[async_trait]
impl EmailSender for FakeEmail {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        if self.fail { return Err(NotifyError::Smtp("535 authentication failed".into())); }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Capture-style gateway whose capture result is fixed up front.
pub struct FakeGateway { capture_status: &'static str, quotes: Mutex<Vec<PaymentQuote>> }

impl FakeGateway {
    pub fn completing() -> Self { Self::with_status("COMPLETED") }
    pub fn with_status(capture_status: &'static str) -> Self { Self { capture_status, quotes: Mutex::new(vec![]) } }
    pub fn quotes(&self) -> Vec<PaymentQuote> { self.quotes.lock().unwrap().clone() }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn provider(&self) -> GatewayProvider { GatewayProvider::PayPal }

    async fn create_intent(&self, quote: &PaymentQuote) -> Result<GatewayIntent, GatewayError> {
        self.quotes.lock().unwrap().push(quote.clone());
        Ok(GatewayIntent {
            provider: GatewayProvider::PayPal, gateway_order_id: "5O190127TN364715T".into(),
            amount: crate::domain::Money::new(quote.total, &quote.currency).minor_units().unwrap_or_default(),
            currency: quote.currency.clone(), client_key: None, approval_url: Some("https://www.sandbox.paypal.com/checkoutnow?token=5O190127TN364715T".into()),
        })
    }

    async fn settle(&self, proof: &SettlementProof) -> Result<Settlement, GatewayError> {
        let SettlementProof::Capture { order_id } = proof else {
            return Err(GatewayError::UnsupportedProof { provider: GatewayProvider::PayPal, proof: "signature" });
        };
        if self.capture_status != "COMPLETED" { return Err(GatewayError::NotCompleted(self.capture_status.to_string())); }
        Ok(Settlement { gateway_order_id: order_id.clone(), gateway_payment_id: "3C679366HH908993F".into() })
    }
}

/// Holds every product lookup until `parties` lookups are in flight, forcing checkouts to interleave.
pub struct BarrierCatalog { inner: Arc<MemoryStore>, barrier: Barrier }

impl BarrierCatalog {
    pub fn new(inner: Arc<MemoryStore>, parties: usize) -> Self { Self { inner, barrier: Barrier::new(parties) } }
}

#[async_trait]
impl CatalogStore for BarrierCatalog {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> { self.inner.insert_product(product).await }
    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let found = self.inner.product(id).await;
        self.barrier.wait().await;
        found
    }
    async fn products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> { self.inner.products(filter).await }
    async fn update_product(&self, product: &Product) -> StoreResult<bool> { self.inner.update_product(product).await }
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> { self.inner.delete_product(id).await }
    async fn adjust_stock(&self, id: Uuid, delta: i64) -> StoreResult<bool> { self.inner.adjust_stock(id, delta).await }
    async fn count_products(&self) -> StoreResult<u64> { self.inner.count_products().await }
}

pub fn stores_over(memory: Arc<MemoryStore>, catalog: Arc<dyn CatalogStore>) -> Stores {
    Stores { catalog, orders: memory.clone(), users: memory.clone(), notifications: memory }
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Asha Rao".into(), phone: "9876543210".into(), address_line1: "12 MG Road".into(),
        city: "Pune".into(), state: "Maharashtra".into(), pincode: "411001".into(), ..Default::default()
    }
}

pub fn new_product(name: &str, price: i64, stock: i64) -> Product {
    Product::create(NewProduct {
        name: name.into(), price: Decimal::new(price, 0), category: Category::Pulses, tags: vec![],
        image_url: format!("https://img.example.com/{}.jpg", name.to_lowercase().replace(' ', "-")), stock, unit: Unit::Kg,
    }).unwrap()
}

pub fn user(name: &str, role: Role) -> User {
    let email = format!("{}@example.com", name.to_lowercase());
    User::new(name, Email::parse(&email).unwrap(), String::new(), role)
}

/// COD order for two units at ₹100.
pub fn sample_order() -> Order {
    let product = new_product("Toor Dal", 100, 10);
    let line = LineItem::snapshot(&product, crate::domain::Quantity::new(2).unwrap());
    Order::place(Uuid::now_v7(), vec![line], "INR", PaymentMethod::CashOnDelivery, address(), None).unwrap()
}

/// A workflow over fresh in-memory stores with recording notifiers.
pub struct Harness {
    pub memory: Arc<MemoryStore>,
    pub stores: Stores,
    pub workflow: OrderWorkflow,
    pub sms: Arc<FakeSms>,
    pub email: Arc<FakeEmail>,
    pub customer: User,
    pub admins: Vec<User>,
}

impl Harness {
    pub async fn new() -> Self { Self::build(WorkflowSettings::default(), None, None).await }

    pub async fn build(settings: WorkflowSettings, gateway: Option<Arc<dyn PaymentGateway>>, catalog: Option<Arc<dyn CatalogStore>>) -> Self {
        Self::with_memory(Arc::new(MemoryStore::default()), settings, gateway, catalog).await
    }

    pub async fn with_memory(memory: Arc<MemoryStore>, settings: WorkflowSettings, gateway: Option<Arc<dyn PaymentGateway>>, catalog: Option<Arc<dyn CatalogStore>>) -> Self {
        let stores = stores_over(memory.clone(), catalog.unwrap_or_else(|| memory.clone() as Arc<dyn CatalogStore>));
        let (sms, email) = (Arc::new(FakeSms::default()), Arc::new(FakeEmail::default()));
        let notifier = Notifier::new(Some(sms.clone()), Some(email.clone()));
        let customer = user("Asha", Role::Customer);
        let admins = vec![user("Admin", Role::Admin), user("Ops", Role::Admin)];
        memory.insert_user(&customer).await.unwrap();
        for admin in &admins { memory.insert_user(admin).await.unwrap(); }
        let workflow = OrderWorkflow::new(stores.clone(), notifier, gateway, settings);
        Self { memory, stores, workflow, sms, email, customer, admins }
    }

    pub async fn stock_product(&self, name: &str, price: i64, stock: i64) -> Product {
        let product = new_product(name, price, stock);
        self.memory.insert_product(&product).await.unwrap();
        product
    }

    pub async fn stock_of(&self, id: Uuid) -> i64 {
        self.memory.product(id).await.unwrap().map(|p| p.stock).unwrap_or_default()
    }

    pub fn admin(&self) -> &User { &self.admins[0] }
}
