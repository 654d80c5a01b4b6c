/// Discord rejects REST calls whose user agent does not follow the
/// `DiscordBot ($url, $version)` format.
pub fn get_user_agent() -> String {
    format!(
        "DiscordBot (https://github.com/modwarden/modwarden, {})",
        env!("CARGO_PKG_VERSION")
    )
}
