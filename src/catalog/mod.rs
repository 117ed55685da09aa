/*!
 * Endpoint catalog
 *
 * Responsibility:
 * - CDR 標準の endpoint 定義 (embedded JSON) と、deployment が実装する subset の保持
 * - 読み込み時の validation (不正なら起動失敗)
 *
 * Public API:
 * - Catalog / EndpointSet
 * - EndpointDefinition / EndpointRecord / TemplateSegment
 */

mod core;
mod types;

pub use self::core::{Catalog, CatalogError, EndpointSet, standard_records};
pub use self::types::{EndpointDefinition, EndpointRecord, ShapeKey, TemplateSegment};
