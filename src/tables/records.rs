//! Column layouts of the eight dataset tables and their row mappings.

use super::schema::{FieldSpec, RowView, TableRecord, TableSchema, Value};
use crate::errors::TableError;
use crate::models::{Client, CreditNote, Currency, FxRate, Invoice, Order, Product, SaleLine, Seller};

const PRODUCT_FIELDS: &[FieldSpec] = &[
    FieldSpec::numeric("PRODUCT_ID", 8, 0),
    FieldSpec::character("SKU", 12),
    FieldSpec::character("PROD_NAME", 60),
    FieldSpec::character("BRAND", 30),
    FieldSpec::character("CATEGORY", 30),
    FieldSpec::numeric("COST", 12, 2),
    FieldSpec::numeric("BASE_PRICE", 12, 2),
    FieldSpec::numeric("EXISTENCIA", 8, 0),
    FieldSpec::numeric("MIN_STOCK", 8, 0),
    FieldSpec::numeric("MAX_STOCK", 8, 0),
];

impl TableRecord for Product {
    const SCHEMA: TableSchema = TableSchema { name: "productos", fields: PRODUCT_FIELDS };

    fn to_row(&self) -> Vec<Value> {
        vec![
            self.product_id.into(),
            self.sku.as_str().into(),
            self.name.as_str().into(),
            self.brand.as_str().into(),
            self.category.as_str().into(),
            self.cost_mxn.into(),
            self.price_mxn.into(),
            self.stock_qty.into(),
            self.min_stock.into(),
            self.max_stock.into(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self, TableError> {
        Ok(Self {
            product_id: row.u32("PRODUCT_ID")?,
            sku: row.text("SKU")?,
            name: row.text("PROD_NAME")?,
            brand: row.text("BRAND")?,
            category: row.text("CATEGORY")?,
            cost_mxn: row.decimal("COST")?,
            price_mxn: row.decimal("BASE_PRICE")?,
            stock_qty: row.u32("EXISTENCIA")?,
            min_stock: row.u32("MIN_STOCK")?,
            max_stock: row.u32("MAX_STOCK")?,
        })
    }
}

const CLIENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::numeric("CLIENT_ID", 8, 0),
    FieldSpec::character("CLNT_NAME", 60),
    FieldSpec::character("ORIGEN_CLI", 20),
    FieldSpec::character("RECOMIENDA", 40),
    FieldSpec::character("REGION", 20),
    FieldSpec::character("CONTACT", 40),
    FieldSpec::character("STATUS", 12),
    FieldSpec::date("LAST_PURCH"),
];

impl TableRecord for Client {
    const SCHEMA: TableSchema = TableSchema { name: "clientes", fields: CLIENT_FIELDS };

    fn to_row(&self) -> Vec<Value> {
        vec![
            self.client_id.into(),
            self.name.as_str().into(),
            self.origin.as_str().into(),
            self.recommendation_source.as_str().into(),
            self.region.as_str().into(),
            self.contact.as_str().into(),
            self.status.as_str().into(),
            self.last_purchase_date.into(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self, TableError> {
        Ok(Self {
            client_id: row.u32("CLIENT_ID")?,
            name: row.text("CLNT_NAME")?,
            origin: row.text("ORIGEN_CLI")?,
            recommendation_source: row.text("RECOMIENDA")?,
            region: row.text("REGION")?,
            contact: row.text("CONTACT")?,
            status: row.text("STATUS")?,
            last_purchase_date: row.date("LAST_PURCH")?,
        })
    }
}

const SELLER_FIELDS: &[FieldSpec] = &[
    FieldSpec::numeric("VENDOR_ID", 6, 0),
    FieldSpec::character("VEND_NAME", 40),
    FieldSpec::character("REGION", 20),
    FieldSpec::character("TEAM", 5),
    FieldSpec::logical("IS_GENERAL"),
];

impl TableRecord for Seller {
    const SCHEMA: TableSchema = TableSchema { name: "vendedores", fields: SELLER_FIELDS };

    fn to_row(&self) -> Vec<Value> {
        vec![
            self.seller_id.into(),
            self.name.as_str().into(),
            self.region.as_str().into(),
            self.team.as_str().into(),
            self.is_general.into(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self, TableError> {
        Ok(Self {
            seller_id: row.u32("VENDOR_ID")?,
            name: row.text("VEND_NAME")?,
            region: row.text("REGION")?,
            team: row.text("TEAM")?,
            is_general: row.bool("IS_GENERAL")?,
        })
    }
}

const FX_FIELDS: &[FieldSpec] = &[FieldSpec::date("FECHA"), FieldSpec::numeric("TC_MXN_USD", 10, 4)];

impl TableRecord for FxRate {
    const SCHEMA: TableSchema = TableSchema { name: "tipo_cambio", fields: FX_FIELDS };

    fn to_row(&self) -> Vec<Value> {
        vec![self.date.into(), self.usd_mxn.into()]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self, TableError> {
        Ok(Self {
            date: row.date("FECHA")?,
            usd_mxn: row.decimal("TC_MXN_USD")?,
        })
    }
}

const SALE_FIELDS: &[FieldSpec] = &[
    FieldSpec::numeric("SALE_ID", 10, 0),
    FieldSpec::numeric("INVOICE_ID", 10, 0),
    FieldSpec::date("SALE_DATE"),
    FieldSpec::numeric("PRODUCT_ID", 8, 0),
    FieldSpec::numeric("CLIENT_ID", 8, 0),
    FieldSpec::numeric("VENDOR_ID", 6, 0),
    FieldSpec::character("ORIGEN_VTA", 20),
    FieldSpec::character("TIPO_FACT", 15),
    FieldSpec::character("TIPO_ORDEN", 15),
    FieldSpec::character("STATUS", 12),
    FieldSpec::numeric("QUANTITY", 6, 0),
    FieldSpec::numeric("UNIT_PRICE", 12, 2),
    FieldSpec::numeric("REVENUE", 14, 2),
    FieldSpec::numeric("REV_USD", 14, 2),
    FieldSpec::character("MONEDA", 3),
    FieldSpec::numeric("TC_MXN_USD", 10, 4),
];

impl TableRecord for SaleLine {
    const SCHEMA: TableSchema = TableSchema { name: "ventas", fields: SALE_FIELDS };

    fn to_row(&self) -> Vec<Value> {
        vec![
            self.sale_id.into(),
            self.invoice_id.into(),
            self.sale_date.into(),
            self.product_id.into(),
            self.client_id.into(),
            self.seller_id.into(),
            self.origin.as_str().into(),
            self.invoice_type.as_str().into(),
            self.order_type.as_str().into(),
            self.status.as_str().into(),
            self.quantity.into(),
            self.unit_price_mxn.into(),
            self.amount_mxn.into(),
            self.amount_usd.into(),
            self.currency.as_ref().into(),
            self.usd_mxn_rate.into(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self, TableError> {
        Ok(Self {
            sale_id: row.u64("SALE_ID")?,
            invoice_id: row.u64("INVOICE_ID")?,
            sale_date: row.date("SALE_DATE")?,
            product_id: row.u32("PRODUCT_ID")?,
            client_id: row.u32("CLIENT_ID")?,
            seller_id: row.u32("VENDOR_ID")?,
            origin: row.text("ORIGEN_VTA")?,
            invoice_type: row.text("TIPO_FACT")?,
            order_type: row.text("TIPO_ORDEN")?,
            status: row.text("STATUS")?,
            quantity: row.u32("QUANTITY")?,
            unit_price_mxn: row.decimal("UNIT_PRICE")?,
            amount_mxn: row.decimal("REVENUE")?,
            amount_usd: row.decimal("REV_USD")?,
            currency: row.parsed::<Currency>("MONEDA")?,
            usd_mxn_rate: row.decimal("TC_MXN_USD")?,
        })
    }
}

const INVOICE_FIELDS: &[FieldSpec] = &[
    FieldSpec::numeric("INVOICE_ID", 10, 0),
    FieldSpec::date("INV_DATE"),
    FieldSpec::numeric("CLIENT_ID", 8, 0),
    FieldSpec::character("CLNT_NAME", 60),
    FieldSpec::numeric("VENDOR_ID", 6, 0),
    FieldSpec::character("VEND_NAME", 40),
    FieldSpec::character("STATUS", 12),
    FieldSpec::character("TIPO_FACT", 15),
    FieldSpec::character("TIPO_ORDEN", 15),
    FieldSpec::numeric("SUBTOTAL", 14, 2),
    FieldSpec::numeric("TOTAL", 14, 2),
    FieldSpec::numeric("TOTAL_USD", 14, 2),
    FieldSpec::character("MONEDA", 3),
    FieldSpec::numeric("TC_MXN_USD", 10, 4),
];

impl TableRecord for Invoice {
    const SCHEMA: TableSchema = TableSchema { name: "facturas", fields: INVOICE_FIELDS };

    fn to_row(&self) -> Vec<Value> {
        vec![
            self.invoice_id.into(),
            self.date.into(),
            self.client_id.into(),
            self.client_name.as_str().into(),
            self.seller_id.into(),
            self.seller_name.as_str().into(),
            self.status.as_str().into(),
            self.invoice_type.as_str().into(),
            self.order_type.as_str().into(),
            self.subtotal_mxn.into(),
            self.total_mxn.into(),
            self.amount_usd.into(),
            self.currency.as_ref().into(),
            self.usd_mxn_rate.into(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self, TableError> {
        Ok(Self {
            invoice_id: row.u64("INVOICE_ID")?,
            date: row.date("INV_DATE")?,
            client_id: row.u32("CLIENT_ID")?,
            client_name: row.text("CLNT_NAME")?,
            seller_id: row.u32("VENDOR_ID")?,
            seller_name: row.text("VEND_NAME")?,
            status: row.text("STATUS")?,
            invoice_type: row.text("TIPO_FACT")?,
            order_type: row.text("TIPO_ORDEN")?,
            subtotal_mxn: row.decimal("SUBTOTAL")?,
            total_mxn: row.decimal("TOTAL")?,
            amount_usd: row.decimal("TOTAL_USD")?,
            currency: row.parsed::<Currency>("MONEDA")?,
            usd_mxn_rate: row.decimal("TC_MXN_USD")?,
        })
    }
}

const CREDIT_NOTE_FIELDS: &[FieldSpec] = &[
    FieldSpec::numeric("NOTE_ID", 10, 0),
    FieldSpec::numeric("INVOICE_ID", 10, 0),
    FieldSpec::date("NOTE_DATE"),
    FieldSpec::numeric("CLIENT_ID", 8, 0),
    FieldSpec::numeric("AMOUNT", 14, 2),
    FieldSpec::character("MOTIVO", 40),
];

impl TableRecord for CreditNote {
    const SCHEMA: TableSchema = TableSchema { name: "notas_credito", fields: CREDIT_NOTE_FIELDS };

    fn to_row(&self) -> Vec<Value> {
        vec![
            self.note_id.into(),
            self.invoice_id.into(),
            self.date.into(),
            self.client_id.into(),
            self.amount_mxn.into(),
            self.reason.as_str().into(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self, TableError> {
        Ok(Self {
            note_id: row.u64("NOTE_ID")?,
            invoice_id: row.u64("INVOICE_ID")?,
            date: row.date("NOTE_DATE")?,
            client_id: row.u32("CLIENT_ID")?,
            amount_mxn: row.decimal("AMOUNT")?,
            reason: row.text("MOTIVO")?,
        })
    }
}

const ORDER_FIELDS: &[FieldSpec] = &[
    FieldSpec::numeric("ORDER_ID", 10, 0),
    FieldSpec::date("ORDER_DATE"),
    FieldSpec::numeric("CLIENT_ID", 8, 0),
    FieldSpec::numeric("VENDOR_ID", 6, 0),
    FieldSpec::numeric("PRODUCT_ID", 8, 0),
    FieldSpec::numeric("QTY_ORDER", 6, 0),
    FieldSpec::numeric("QTY_PEND", 6, 0),
    FieldSpec::character("STATUS", 12),
    FieldSpec::character("ORIGEN_VTA", 20),
    FieldSpec::character("TIPO_ORDEN", 15),
];

impl TableRecord for Order {
    const SCHEMA: TableSchema = TableSchema { name: "pedidos", fields: ORDER_FIELDS };

    fn to_row(&self) -> Vec<Value> {
        vec![
            self.order_id.into(),
            self.date.into(),
            self.client_id.into(),
            self.seller_id.into(),
            self.product_id.into(),
            self.qty_ordered.into(),
            self.qty_pending.into(),
            self.status.as_ref().into(),
            self.channel.as_str().into(),
            self.order_type.as_str().into(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self, TableError> {
        Ok(Self {
            order_id: row.u64("ORDER_ID")?,
            date: row.date("ORDER_DATE")?,
            client_id: row.u32("CLIENT_ID")?,
            seller_id: row.u32("VENDOR_ID")?,
            product_id: row.u32("PRODUCT_ID")?,
            qty_ordered: row.u32("QTY_ORDER")?,
            qty_pending: row.u32("QTY_PEND")?,
            status: row.parsed("STATUS")?,
            channel: row.text("ORIGEN_VTA")?,
            order_type: row.text("TIPO_ORDEN")?,
        })
    }
}
