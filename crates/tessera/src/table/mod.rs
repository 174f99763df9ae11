//! Table view state
//!
//! - `state`: the state machine over sort, filters, paging, visibility and selection
//! - `codec`: URL (de)serialization of the non-default subset of that state
//! - `controller`: state → query, with a guard against superseded responses
//! - `query_params`: an ordered query-string multimap

pub mod codec;
pub mod controller;
pub mod query_params;
pub mod state;

pub use codec::{StateCodec, TableStatePatch, TableUrlCodec};
pub use controller::{TableController, TableRequest};
pub use query_params::QueryParams;
pub use state::{
    ColumnSort, DateRange, TableAction, TableOptions, TableState, TableStateMachine, ALL_TAB,
};
