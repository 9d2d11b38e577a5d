pub mod answers;
pub mod codec;
pub mod errors;
pub mod ids;
pub mod payload;
pub mod protocol;
pub mod types;

pub use answers::UserAnswers;
pub use codec::{decode_payload, encode_payload};
pub use errors::CodecError;
pub use ids::{PeerId, SessionId};
pub use payload::{InvitePayload, PairPayloads, PairResultPayload};
pub use protocol::{parse_message, PeerMessage};
pub use types::{Axis, DuoFamily, DuoVariant, PersonalType, Role, ScoreVector, SoloVariant, Viewer};
