use serde::{Deserialize, Serialize};
use std::fmt;

/// 每個子訂單固定的商品欄位數
pub const PRODUCT_SLOTS: usize = 5;

/// 記錄中的一個葉節點欄位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: Option<String>,
    pub attributes: Vec<(String, String)>,
    /// 出現在此欄位之前 (或欄位內) 的註解
    pub comments: Vec<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
            attributes: Vec::new(),
            comments: Vec::new(),
        }
    }
}

/// 檔案中的一筆原始記錄，依文件順序保存所有欄位、屬性與註解
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    /// 出現在此記錄之前的註解
    pub comments: Vec<String>,
    pub fields: Vec<Field>,
    /// 最後一個欄位之後、結束標籤之前的註解
    pub trailing_comments: Vec<String>,
}

impl Record {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .and_then(|field| field.value.as_deref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }

    /// 更新既有欄位；欄位不存在時附加在最後
    pub fn set(&mut self, name: &str, value: Option<String>) {
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field::new(name, value)),
        }
    }

    /// 保留欄位順序但清空所有值；屬性與註解屬於原記錄，不複製
    pub fn blanked(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            fields: self
                .fields
                .iter()
                .map(|field| Field::new(field.name.clone(), None))
                .collect(),
            ..Default::default()
        }
    }
}

/// 單一商品欄位 (productNN / quantityNN / priceNN / discountNN)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSlot {
    pub code: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
    pub discount: Option<String>,
}

impl ProductSlot {
    pub fn placeholder(code: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            quantity: Some("1.0000".to_string()),
            price: Some("0.0000".to_string()),
            discount: Some("0.0000".to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suborder {
    pub lastname: Option<String>,
    pub firstname: Option<String>,
    pub slastname: Option<String>,
    pub sfirstname: Option<String>,
    pub cardholder: Option<String>,
    pub shipvia: Option<String>,
    pub scountry: Option<String>,
    pub saddress1: Option<String>,
    pub saddress2: Option<String>,
    pub promo_code: Option<String>,
    pub custom01: Option<String>,
    pub holddate: Option<String>,
    pub products: [ProductSlot; PRODUCT_SLOTS],
    /// 原始記錄：未建模的欄位與欄位順序
    layout: Record,
}

fn slot_tags(slot: usize) -> [String; 4] {
    let n = slot + 1;
    [
        format!("product{:02}", n),
        format!("quantity{:02}", n),
        format!("price{:02}", n),
        format!("discount{:02}", n),
    ]
}

macro_rules! typed_fields {
    ($($field:ident),* $(,)?) => {
        const TYPED_FIELDS: &[&str] = &[$(stringify!($field)),*];

        impl Suborder {
            pub fn from_record(record: &Record) -> Self {
                let owned = |name: &str| record.get(name).map(str::to_string);
                let products = std::array::from_fn(|slot| {
                    let [code, quantity, price, discount] = slot_tags(slot);
                    ProductSlot {
                        code: owned(&code),
                        quantity: owned(&quantity),
                        price: owned(&price),
                        discount: owned(&discount),
                    }
                });
                Self {
                    $($field: owned(stringify!($field)),)*
                    products,
                    layout: record.clone(),
                }
            }

            /// 將型別化欄位寫回原始記錄，保留原本的欄位順序
            pub fn to_record(&self) -> Record {
                let mut record = self.layout.clone();
                $(
                    if self.$field.is_some() || record.has(stringify!($field)) {
                        record.set(stringify!($field), self.$field.clone());
                    }
                )*
                for (slot, product) in self.products.iter().enumerate() {
                    let [code, quantity, price, discount] = slot_tags(slot);
                    for (tag, value) in [
                        (code, &product.code),
                        (quantity, &product.quantity),
                        (price, &product.price),
                        (discount, &product.discount),
                    ] {
                        if value.is_some() || record.has(&tag) {
                            record.set(&tag, value.clone());
                        }
                    }
                }
                record
            }
        }
    };
}

typed_fields!(
    lastname, firstname, slastname, sfirstname, cardholder, shipvia, scountry, saddress1,
    saddress2, promo_code, custom01, holddate,
);

impl Suborder {
    /// 依照範本記錄的欄位順序建立空白子訂單
    pub fn blank_like(template: &Suborder) -> Self {
        Self::from_record(&template.layout.blanked())
    }

    /// 取得原始記錄中未建模的欄位值
    pub fn extra(&self, name: &str) -> Option<&str> {
        if TYPED_FIELDS.contains(&name) {
            return None;
        }
        self.layout.get(name)
    }

    pub fn set_extra(&mut self, name: &str, value: Option<String>) {
        if !TYPED_FIELDS.contains(&name) {
            self.layout.set(name, value);
        }
    }

    /// 連續填入的商品欄位；第一個空欄位之後全部視為不存在
    pub fn populated_products(&self) -> impl Iterator<Item = &ProductSlot> {
        self.products.iter().take_while(|slot| !slot.is_empty())
    }

    pub fn product_codes(&self) -> Vec<&str> {
        self.populated_products()
            .filter_map(|slot| slot.code.as_deref())
            .collect()
    }

    pub fn first_free_slot(&self) -> Option<usize> {
        self.products.iter().position(ProductSlot::is_empty)
    }

    pub fn billing_name(&self) -> Option<String> {
        join_name(self.firstname.as_deref(), self.lastname.as_deref())
    }

    pub fn shipping_name(&self) -> Option<String> {
        join_name(self.sfirstname.as_deref(), self.slastname.as_deref())
    }
}

fn join_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let name = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}

/// 一個訂單檔案 = 一或多筆子訂單
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Order {
    pub order_number: String,
    pub file_name: String,
    pub root_tag: String,
    pub root_attributes: Vec<(String, String)>,
    pub xml_declaration: bool,
    /// 根元素之前的註解
    pub prolog_comments: Vec<String>,
    pub suborders: Vec<Suborder>,
    /// 最後一筆記錄之後、根元素結束之前的註解
    pub trailing_comments: Vec<String>,
}

impl Order {
    pub fn all_product_codes(&self) -> Vec<&str> {
        self.suborders
            .iter()
            .flat_map(|suborder| suborder.product_codes())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Fraud,
    Product,
    Shipping,
    Address,
    Promo,
    Rescue,
    HoldDate,
    Error,
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Fraud => "fraud",
            Self::Product => "product",
            Self::Shipping => "shipping",
            Self::Address => "address",
            Self::Promo => "promo",
            Self::Rescue => "rescue",
            Self::HoldDate => "holddate",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: FindingCategory,
    pub message: String,
    /// 此發現是否會讓訂單進入保留
    pub hold: bool,
}

impl Finding {
    pub fn hold(category: FindingCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            hold: true,
        }
    }

    pub fn note(category: FindingCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            hold: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::note(FindingCategory::Error, message)
    }

    pub fn is_error(&self) -> bool {
        self.category == FindingCategory::Error
    }
}

/// 規則評估結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub findings: Vec<Finding>,
    pub hold: bool,
}

impl Evaluation {
    /// 相同的發現在同一訂單只記錄一次
    pub fn push(&mut self, finding: Finding) {
        self.hold |= finding.hold;
        if !self.findings.contains(&finding) {
            self.findings.push(finding);
        }
    }

    pub fn extend(&mut self, other: Evaluation) {
        for finding in other.findings {
            self.push(finding);
        }
    }

    pub fn messages(&self) -> Vec<&str> {
        self.findings.iter().map(|f| f.message.as_str()).collect()
    }
}
