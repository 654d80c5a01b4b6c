mod guild;
pub use self::guild::{Application, Member, PartialGuild, Role};

mod message;
pub use self::message::{CreateMessage, Message, RateLimitBody};

mod user;
pub use self::user::User;

/// Snowflake identifier of a guild.
pub type GuildId = String;
/// Snowflake identifier of a user.
pub type UserId = String;
/// Snowflake identifier of a role.
pub type RoleId = String;
/// Snowflake identifier of a channel.
pub type ChannelId = String;
/// Snowflake identifier of a message.
pub type MessageId = String;
