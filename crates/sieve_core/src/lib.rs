pub mod api;
pub mod error;
pub mod keyset;
pub mod page;
pub mod params;
pub mod predicate;
pub mod projection;
pub mod registry;

pub use api::*;
pub use error::{SieveError, SieveResult};
pub use keyset::{KeySet, Multiset, paginate_multiset};
pub use page::{PageRequest, PageResult, SortOrder, parse_sort};
pub use params::FilterParams;
pub use predicate::{CompareOp, Predicate, PredicateBuilder};
pub use projection::*;
pub use registry::{EntityDescriptor, FieldDef, FieldType, Table, descriptor};
