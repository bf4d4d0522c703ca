pub mod community;
pub mod message;
pub mod user;

pub use community::{Channel, ChannelKind, CommunityGroup, CommunitySummary, MemberRole, Membership, NewCommunity};
pub use message::{Message, MessageKind, MessagePage, NewMessage};
pub use user::User;
