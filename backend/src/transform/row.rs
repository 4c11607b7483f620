//! Flatten one input row.
//!
//! The query string in the selected cell is decoded, indexed item keys
//! (`item3`, `amt3`, `qty3`, `dcnt3`) are regrouped per line item, and the
//! items are serialized back as `;`-joined columns next to the scalar fields.
//!
//! ```text
//! item1=SKU1&amt1=10&qty1=2&item2=SKU2&amt2=5&qty2=1&currency=EUR
//!
//! Separate:  itemSku=SKU1;SKU2  itemUnitPrice=10;5  itemQuantity=2;1  currency=EUR
//! Combined:  items=SKU1;10;2;;SKU2;5;1;                                currency=EUR
//! ```

use std::borrow::Cow;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RowTransformError;
use crate::parser::{Cell, MISSING_CELL};
use crate::query::{decode, FieldMap};

/// Separator between the values of one assembled item column.
pub const ITEM_SEPARATOR: &str = ";";

/// Highest item index accepted in a row unless configured otherwise.
pub const DEFAULT_MAX_ITEM_INDEX: usize = 1_000_000;

static ITEM_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(item|amt|qty|dcnt)([0-9]+)$").expect("item key pattern is valid")
});

/// How the line items of a row are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemMode {
    /// One `items` column, four values per item.
    #[default]
    Combined,
    /// `itemSku`, `itemUnitPrice`, `itemQuantity` and `itemDiscount` columns.
    Separate,
}

impl ItemMode {
    pub fn from_separate(separate_items: bool) -> Self {
        if separate_items {
            ItemMode::Separate
        } else {
            ItemMode::Combined
        }
    }
}

/// The four recognized item attributes, in serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemPrefix {
    Item,
    Amt,
    Qty,
    Dcnt,
}

impl ItemPrefix {
    pub const ALL: [ItemPrefix; 4] = [
        ItemPrefix::Item,
        ItemPrefix::Amt,
        ItemPrefix::Qty,
        ItemPrefix::Dcnt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemPrefix::Item => "item",
            ItemPrefix::Amt => "amt",
            ItemPrefix::Qty => "qty",
            ItemPrefix::Dcnt => "dcnt",
        }
    }

    fn parse(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "item" => Some(ItemPrefix::Item),
            "amt" => Some(ItemPrefix::Amt),
            "qty" => Some(ItemPrefix::Qty),
            "dcnt" => Some(ItemPrefix::Dcnt),
            _ => None,
        }
    }
}

/// Values of one line item. Absent attributes are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemRecord {
    pub sku: String,
    pub unit_price: String,
    pub quantity: String,
    pub discount: String,
}

impl ItemRecord {
    pub fn get(&self, prefix: ItemPrefix) -> &str {
        match prefix {
            ItemPrefix::Item => &self.sku,
            ItemPrefix::Amt => &self.unit_price,
            ItemPrefix::Qty => &self.quantity,
            ItemPrefix::Dcnt => &self.discount,
        }
    }

    fn set(&mut self, prefix: ItemPrefix, value: String) {
        let slot = match prefix {
            ItemPrefix::Item => &mut self.sku,
            ItemPrefix::Amt => &mut self.unit_price,
            ItemPrefix::Qty => &mut self.quantity,
            ItemPrefix::Dcnt => &mut self.discount,
        };
        *slot = value;
    }
}

/// Name of an output column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputField {
    /// Non-item key copied from the query string.
    Scalar(String),
    ItemSku,
    ItemUnitPrice,
    ItemQuantity,
    ItemDiscount,
    Items,
}

impl OutputField {
    pub fn name(&self) -> &str {
        match self {
            OutputField::Scalar(name) => name,
            OutputField::ItemSku => "itemSku",
            OutputField::ItemUnitPrice => "itemUnitPrice",
            OutputField::ItemQuantity => "itemQuantity",
            OutputField::ItemDiscount => "itemDiscount",
            OutputField::Items => "items",
        }
    }
}

/// Item columns assembled for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemColumns {
    Separate {
        sku: String,
        unit_price: String,
        quantity: String,
        /// `None` when no item of the row has a discount.
        discount: Option<String>,
    },
    Combined {
        items: String,
    },
}

impl ItemColumns {
    /// Serialize `items` (index 1 first) according to `mode`.
    pub fn assemble(items: &[ItemRecord], mode: ItemMode) -> Self {
        match mode {
            ItemMode::Separate => {
                let join = |prefix: ItemPrefix| {
                    items
                        .iter()
                        .map(|item| item.get(prefix))
                        .collect::<Vec<_>>()
                        .join(ITEM_SEPARATOR)
                };
                let has_discount = items.iter().any(|item| !item.discount.is_empty());
                ItemColumns::Separate {
                    sku: join(ItemPrefix::Item),
                    unit_price: join(ItemPrefix::Amt),
                    quantity: join(ItemPrefix::Qty),
                    discount: has_discount.then(|| join(ItemPrefix::Dcnt)),
                }
            }
            ItemMode::Combined => {
                let values: Vec<&str> = items
                    .iter()
                    .flat_map(|item| ItemPrefix::ALL.into_iter().map(move |p| item.get(p)))
                    .collect();
                ItemColumns::Combined {
                    items: values.join(ITEM_SEPARATOR),
                }
            }
        }
    }

    fn fields(&self) -> Vec<(OutputField, &str)> {
        match self {
            ItemColumns::Separate {
                sku,
                unit_price,
                quantity,
                discount,
            } => {
                let mut fields = vec![
                    (OutputField::ItemSku, sku.as_str()),
                    (OutputField::ItemUnitPrice, unit_price.as_str()),
                    (OutputField::ItemQuantity, quantity.as_str()),
                ];
                if let Some(discount) = discount {
                    fields.push((OutputField::ItemDiscount, discount.as_str()));
                }
                fields
            }
            ItemColumns::Combined { items } => vec![(OutputField::Items, items.as_str())],
        }
    }
}

/// The flattened form of one input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    /// Non-item fields in query-string order.
    pub scalars: IndexMap<String, String>,
    pub items: ItemColumns,
}

impl OutputRecord {
    /// All output fields. An assembled item field hides a scalar of the
    /// same name.
    pub fn fields(&self) -> Vec<(OutputField, &str)> {
        let assembled = self.items.fields();
        let mut fields: Vec<(OutputField, &str)> = self
            .scalars
            .iter()
            .filter(|(name, _)| !assembled.iter().any(|(f, _)| f.name() == name.as_str()))
            .map(|(name, value)| (OutputField::Scalar(name.clone()), value.as_str()))
            .collect();
        fields.extend(assembled);
        fields
    }

    /// Column names present in this record.
    pub fn keys(&self) -> Vec<String> {
        self.fields()
            .into_iter()
            .map(|(field, _)| field.name().to_string())
            .collect()
    }

    /// Value of column `name`, if the record has it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .fields()
            .into_iter()
            .find(|(field, _)| field.name() == name)
            .map(|(_, value)| value)
            .or_else(|| self.scalars.get(name).map(String::as_str))
    }
}

/// Flattens rows of a dataset using a fixed column and item mode.
#[derive(Debug, Clone)]
pub struct RowTransformer {
    pub column_index: usize,
    pub mode: ItemMode,
    pub max_item_index: usize,
}

impl RowTransformer {
    pub fn new(column_index: usize, mode: ItemMode) -> Self {
        Self {
            column_index,
            mode,
            max_item_index: DEFAULT_MAX_ITEM_INDEX,
        }
    }

    pub fn with_max_item_index(mut self, max_item_index: usize) -> Self {
        self.max_item_index = max_item_index;
        self
    }

    /// Flatten one row.
    pub fn transform(&self, row: &[Cell]) -> Result<OutputRecord, RowTransformError> {
        let raw = row
            .get(self.column_index)
            .map_or(Cow::Borrowed(MISSING_CELL), Cell::as_text);
        self.transform_query(&raw)
    }

    /// Flatten a raw query string.
    pub fn transform_query(&self, raw: &str) -> Result<OutputRecord, RowTransformError> {
        let fields = decode(raw);
        let (scalars, items) = split_fields(fields, self.max_item_index)?;

        Ok(OutputRecord {
            scalars,
            items: ItemColumns::assemble(&items, self.mode),
        })
    }
}

/// Flatten `row` with the default item index limit.
pub fn transform_row(
    row: &[Cell],
    column_index: usize,
    mode: ItemMode,
) -> Result<OutputRecord, RowTransformError> {
    RowTransformer::new(column_index, mode).transform(row)
}

/// Separate scalar fields from item fields and rebuild the item list.
///
/// The returned list covers indices `1..=max_index`; index 0 is dropped.
fn split_fields(
    fields: FieldMap,
    max_item_index: usize,
) -> Result<(IndexMap<String, String>, Vec<ItemRecord>), RowTransformError> {
    let mut scalars = IndexMap::new();
    let mut indexed: Vec<(usize, ItemPrefix, String)> = Vec::new();
    let mut max_index = 0;

    for (key, value) in fields {
        let Some((prefix, index)) = parse_item_key(&key, max_item_index)? else {
            scalars.insert(key, value);
            continue;
        };
        max_index = max_index.max(index);
        indexed.push((index, prefix, value));
    }

    let mut items = vec![ItemRecord::default(); max_index];
    for (index, prefix, value) in indexed {
        if index > 0 {
            items[index - 1].set(prefix, value);
        }
    }

    Ok((scalars, items))
}

/// `Some((prefix, index))` for an item key, `None` for a scalar key.
fn parse_item_key(
    key: &str,
    max_item_index: usize,
) -> Result<Option<(ItemPrefix, usize)>, RowTransformError> {
    let Some(caps) = ITEM_KEY.captures(key) else {
        return Ok(None);
    };
    let Some(prefix) = ItemPrefix::parse(&caps[1]) else {
        return Ok(None);
    };

    let index: usize = caps[2]
        .parse()
        .map_err(|_| RowTransformError::InvalidItemIndex { key: key.to_string() })?;

    if index > max_item_index {
        return Err(RowTransformError::ItemIndexTooLarge {
            key: key.to_string(),
            index,
            max: max_item_index,
        });
    }

    Ok(Some((prefix, index)))
}
