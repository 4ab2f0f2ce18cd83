pub mod channel;
pub mod config;
pub mod debug;
pub mod error;
pub mod fixture;
pub mod host;
pub mod logging;
pub mod path;
pub mod preview;
pub mod router;
pub mod snapshot;
pub mod value;

pub use channel::{ExecutionChannel, KernelChannel, LocalChannel};
pub use config::BridgeConfig;
pub use debug::{ContextSlot, DebugPreviewServer, PreviewCache};
pub use error::{ChannelError, DebugClientError, PathError};
pub use host::{serve_channel, Session};
pub use path::{resolve, PathExpr};
pub use preview::{preview, Preview, PreviewOptions};
pub use router::{DebugPreviewClient, RequestRouter};
pub use snapshot::{list, Filters, VariableDescriptor};
pub use value::{Namespace, Value};
