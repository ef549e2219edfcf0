pub mod balancer;
pub mod correlate;
pub mod detect;
pub mod exposure;
pub mod graph;
pub mod model;
pub mod provider;
pub mod sanitize;

pub use balancer::{
    build_load_balancer_subgraph, build_load_balancer_subgraph_with, is_broad_subnet,
};
pub use correlate::{
    Correlation, CorrelationStrategy, DefaultCorrelation, FallbackCorrelation, NameCorrelation,
    PublicWebPortCorrelation, default_correlation,
};
pub use detect::{detect_external_ranges, is_external_source};
pub use exposure::{ExposedGroup, NO_EXPOSURE_TOKEN, build_subgraph, exposed_security_groups};
pub use graph::{
    ATTACK_SURFACE_PALETTE, ClassDef, Cluster, LOAD_BALANCER_PALETTE, RenderEdge, RenderNode,
    StyleClass, Subgraph,
};
pub use model::{
    AutoScalingGroup, Components, Direction, IPV4_ANYWHERE, IPV6_ANYWHERE, Instance, LoadBalancer,
    Rule, SecurityGroup,
};
pub use provider::{
    InventoryDocument, JsonInventoryProvider, SnapshotProvider, SnapshotRequest, assemble,
};
pub use sanitize::{NodeKind, TokenCollision, find_token_collisions, node_token};
