//! Reconciliation core
//!
//! This module keeps declared Compute objects in sync with the API. A
//! resource kind describes its fields and templates once; the shared
//! controller drives every kind through the same lifecycle.
//!
//! # Architecture
//!
//! - [`value`] / [`reference`] - the field codec building blocks: emptiness
//!   predicates, payload assembly, self-link resolution
//! - [`template`] - `{field}` templates for ids and API paths
//! - [`import`] - import id pattern matching
//! - [`operation`] - operation polling with deadline and backoff
//! - [`controller`] - Create/Read/Delete/Import over any [`ResourceKind`]
//! - [`address`] / [`route`] - the two resource kinds
//!
//! # Example
//!
//! ```ignore
//! use gcpsync::resource::{AddressState, ComputeAddress, ResourceController, ResourceData};
//!
//! async fn reserve(ctx: &gcpsync::resource::ProviderContext) -> gcpsync::Result<()> {
//!     let controller = ResourceController::new(ComputeAddress);
//!     let mut data = ResourceData::desired(AddressState {
//!         name: "addr1".to_string(),
//!         ..Default::default()
//!     });
//!     let id = controller.create(ctx, &mut data).await?;
//!     println!("created {id}: {:?}", data.state.address);
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod context;
pub mod controller;
pub mod import;
pub mod operation;
pub mod reference;
pub mod route;
pub mod template;
pub mod value;

pub use address::{AddressState, ComputeAddress};
pub use context::{Defaults, ProviderContext};
pub use controller::{ReadOutcome, ResourceController, ResourceData, ResourceKind, Timeouts};
pub use operation::{Operation, OperationState, OperationWaiter};
pub use route::{ComputeRoute, RouteState};
