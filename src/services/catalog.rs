//! Reference catalog: products, clients, sellers and the FX calendar.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::config::GeneratorConfig;
use crate::context::GenerationContext;
use crate::errors::GenerationError;
use crate::models::seller::GENERAL_SELLER_NAME;
use crate::models::{Client, FxTable, Product, Seller};
use crate::services::currency::{decimal_from_f64, round_money, RATE_DP};

pub const BRANDS: [&str; 20] = [
    "Andes", "Pacifica", "Sierra", "Aurora", "Delta", "Altiplano", "Brisa", "Cumbres", "Laguna",
    "Montaña", "Océano", "Nativo", "Solaria", "Fresca", "Quetzal", "Riviera", "Vértice", "Néctar",
    "Horizonte", "Tundra",
];

pub const REGIONS: [&str; 5] = ["Norte", "Centro", "Sur", "Occidente", "Oriente"];

const CLIENT_ORIGINS: [&str; 7] = [
    "Nuevo", "Existente", "Web", "Recomendación", "Campaña", "Mostrador", "Distribuidor",
];
const RECOMMENDATION_SOURCES: [&str; 6] = [
    "Ninguna", "Cliente existente", "Redes sociales", "Google", "Expo comercial", "Vendedor",
];
const PRESENTATIONS: [&str; 9] = [
    "250ml", "500ml", "1L", "2L", "500g", "1kg", "2kg", "Caja 12", "Caja 24",
];
const FIRST_NAMES: [&str; 16] = [
    "Ana", "Luis", "María", "Carlos", "Jorge", "Sofía", "Elena", "Camila", "Mateo", "Diego",
    "Lucía", "Valentina", "Regina", "Pablo", "Fernanda", "Iván",
];
const LAST_NAMES: [&str; 8] = [
    "Gómez", "López", "Rodríguez", "Pérez", "Martínez", "Santos", "Vega", "Ramírez",
];
const COMPANY_PREFIX: [&str; 6] = [
    "Alimentos", "Distribuciones", "Comercial", "Servicios", "Grupo", "Mayoreo",
];
const COMPANY_SUFFIX: [&str; 7] = [
    "Andina", "del Pacífico", "Latam", "Sur", "Global", "Norte", "Metropolitano",
];
const TEAMS: [&str; 3] = ["A", "B", "C"];

/// Cost and markup bands of one product category.
struct CategoryProfile {
    name: &'static str,
    cost_range: (f64, f64),
    markup_range: (f64, f64),
    items: [&'static str; 5],
}

static CATEGORIES: [CategoryProfile; 5] = [
    CategoryProfile {
        name: "Bebidas",
        cost_range: (8.0, 60.0),
        markup_range: (1.25, 1.60),
        items: ["Agua Mineral", "Jugo Natural", "Refresco Cola", "Té Frío", "Bebida Energética"],
    },
    CategoryProfile {
        name: "Limpieza",
        cost_range: (15.0, 120.0),
        markup_range: (1.30, 1.70),
        items: ["Detergente", "Limpiador Multiuso", "Desinfectante", "Jabón Líquido", "Lavavajillas"],
    },
    CategoryProfile {
        name: "Snacks",
        cost_range: (6.0, 45.0),
        markup_range: (1.35, 1.80),
        items: ["Papas", "Galletas", "Barra Cereal", "Frutos Secos", "Granola"],
    },
    CategoryProfile {
        name: "Hogar",
        cost_range: (20.0, 250.0),
        markup_range: (1.25, 1.55),
        items: ["Toalla", "Papel Higiénico", "Velas", "Ambientador", "Servilletas"],
    },
    CategoryProfile {
        name: "Cuidado Personal",
        cost_range: (25.0, 180.0),
        markup_range: (1.40, 1.90),
        items: ["Shampoo", "Crema Corporal", "Jabón de Manos", "Desodorante", "Acondicionador"],
    },
];

/// Static entities every transaction references.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub clients: Vec<Client>,
    pub sellers: Vec<Seller>,
    pub fx_rates: FxTable,
}

/// Builds the whole catalog. Draw order is fixed: products, clients, sellers, FX.
#[instrument(skip_all, fields(seed = ctx.seed()))]
pub fn build_catalog(
    config: &GeneratorConfig,
    ctx: &mut GenerationContext,
) -> Result<Catalog, GenerationError> {
    config.check()?;

    let products = build_products(config, ctx)?;
    let clients = build_clients(config, ctx);
    let sellers = build_sellers(config, ctx);
    let fx_rates = build_fx_calendar(config, ctx)?;

    info!(
        products = products.len(),
        clients = clients.len(),
        sellers = sellers.len(),
        fx_days = fx_rates.len(),
        "Catalog built"
    );
    Ok(Catalog { products, clients, sellers, fx_rates })
}

pub fn build_products(
    config: &GeneratorConfig,
    ctx: &mut GenerationContext,
) -> Result<Vec<Product>, GenerationError> {
    let mut products = Vec::with_capacity(config.product_count as usize);
    for product_id in 1..=config.product_count {
        let category = &CATEGORIES[ctx.between(0, CATEGORIES.len() as u32 - 1) as usize];
        let brand = ctx.label(&BRANDS);
        let item = ctx.label(&category.items);
        let presentation = ctx.label(&PRESENTATIONS);

        let cost_f = ctx.uniform(category.cost_range.0, category.cost_range.1);
        let markup_f = ctx.uniform(category.markup_range.0, category.markup_range.1);
        let cost = decimal_from_f64(cost_f, 2)
            .ok_or_else(|| GenerationError::integrity("product.cost", "non-finite cost draw"))?;
        let markup = decimal_from_f64(markup_f, RATE_DP)
            .ok_or_else(|| GenerationError::integrity("product.markup", "non-finite markup"))?;
        let price = round_money(cost * markup);

        let min_stock = ctx.between(5, 40);
        let max_stock = min_stock + ctx.between(30, 300);
        let upper = (f64::from(max_stock) * 1.2).round() as u32;
        let stock_qty = ctx.between(min_stock / 2, upper);

        products.push(Product {
            product_id,
            sku: format!("SKU{:05}", product_id),
            name: format!("{} {} {}", item, presentation, brand),
            brand: brand.to_string(),
            category: category.name.to_string(),
            cost_mxn: cost,
            price_mxn: price,
            stock_qty,
            min_stock,
            max_stock,
        });
    }
    debug!(count = products.len(), "Products generated");
    Ok(products)
}

pub fn build_clients(config: &GeneratorConfig, ctx: &mut GenerationContext) -> Vec<Client> {
    (1..=config.client_count)
        .map(|client_id| {
            let name = format!(
                "{} {} {:03}",
                ctx.label(&COMPANY_PREFIX),
                ctx.label(&COMPANY_SUFFIX),
                client_id
            );
            let origin = ctx.label(&CLIENT_ORIGINS);
            let recommendation_source = if origin == "Recomendación" {
                person_name(ctx)
            } else {
                ctx.label(&RECOMMENDATION_SOURCES).to_string()
            };
            let region = ctx.label(&REGIONS).to_string();
            let contact = person_name(ctx);
            let status = if ctx.chance(0.85) { "Activo" } else { "Inactivo" };
            let days_back = i64::from(ctx.between(120, 900));
            Client {
                client_id,
                name,
                origin: origin.to_string(),
                recommendation_source,
                region,
                contact,
                status: status.to_string(),
                last_purchase_date: config.end_date - Duration::days(days_back),
            }
        })
        .collect()
}

/// Named sellers first; the catch-all seller always takes the last id.
pub fn build_sellers(config: &GeneratorConfig, ctx: &mut GenerationContext) -> Vec<Seller> {
    (1..=config.seller_count)
        .map(|seller_id| {
            let is_general = seller_id == config.seller_count;
            let name = if is_general {
                GENERAL_SELLER_NAME.to_string()
            } else {
                person_name(ctx)
            };
            Seller {
                seller_id,
                name,
                region: ctx.label(&REGIONS).to_string(),
                team: ctx.label(&TEAMS).to_string(),
                is_general,
            }
        })
        .collect()
}

/// One rate per calendar day, mean-reverting towards the baseline and clamped to the
/// configured band.
pub fn build_fx_calendar(
    config: &GeneratorConfig,
    ctx: &mut GenerationContext,
) -> Result<FxTable, GenerationError> {
    let mut table = FxTable::new();
    let mut rate = config.fx_baseline;
    for date in window_days(config.start_date, config.end_date) {
        let shock = ctx.uniform(-config.fx_daily_volatility, config.fx_daily_volatility);
        rate += config.fx_mean_reversion * (config.fx_baseline - rate) + shock;
        rate = rate.clamp(config.fx_floor, config.fx_ceiling);

        let value = decimal_from_f64(rate, RATE_DP)
            .filter(|r| *r > Decimal::ZERO)
            .ok_or_else(|| {
                GenerationError::integrity("fx.positive", format!("rate {} on {}", rate, date))
            })?;
        table.insert(date, value);
    }

    if table.len() as i64 != config.window_days() || !table.is_contiguous() {
        return Err(GenerationError::integrity(
            "fx.complete",
            format!(
                "calendar has {} rows for a {}-day window",
                table.len(),
                config.window_days()
            ),
        ));
    }
    Ok(table)
}

/// Every calendar day in `[start, end]`.
pub fn window_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

fn person_name(ctx: &mut GenerationContext) -> String {
    format!("{} {}", ctx.label(&FIRST_NAMES), ctx.label(&LAST_NAMES))
}
