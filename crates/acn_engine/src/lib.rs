//! Navigator engine: page tree access, site rules and the change-detecting scanner.
mod decode;
mod extract;
mod host;
mod persist;
mod platforms;
mod registry;
mod scanner;

pub use decode::{decode_snapshot, DecodeError, DecodedHtml};
pub use extract::extract_messages;
pub use host::{
    HostError, HostTree, HtmlTree, MutationKind, MutationRecord, MutationSubscription,
    SubscriptionId,
};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use platforms::{builtin_rule_sets, RoleResolver, RuleSet, GENERIC_RULES};
pub use registry::{hostname_of, CompiledRules, LocatorRegistry, FALLBACK_MESSAGE_QUERY};
pub use scanner::{
    ChannelUpdateSink, Lifecycle, ScanOutcome, Scanner, ScannerConfig, StartOptions, UpdateSink,
};
