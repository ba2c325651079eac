pub const USER: &str = "manga_user";
pub const TOKEN: &str = "manga_token";
pub const REFRESH: &str = "manga_refresh";

pub const BOOKMARKS: &str = "manga_bookmarks";
pub const BOOKMARKS_DIRTY: &str = "manga_bookmarks_dirty";
pub const HISTORY: &str = "manga_history";
pub const UNLOCKED_ACHIEVEMENTS: &str = "unlocked_achievements";
pub const TOTAL_READING_SECONDS: &str = "total_reading_seconds";
pub const EQUIPPED_TITLE: &str = "equipped_title";
pub const EQUIPPED_TITLE_NAME: &str = "equipped_title_name";
pub const EQUIPPED_TITLE_RARITY: &str = "equipped_title_rarity";

pub const RATING_PREFIX: &str = "rating_";
pub const COMMENTS_PREFIX: &str = "comments_";

pub const USER_SCOPED: [&str; 8] = [
    BOOKMARKS,
    BOOKMARKS_DIRTY,
    HISTORY,
    UNLOCKED_ACHIEVEMENTS,
    TOTAL_READING_SECONDS,
    EQUIPPED_TITLE,
    EQUIPPED_TITLE_NAME,
    EQUIPPED_TITLE_RARITY,
];

pub fn is_user_scoped_prefix(key: &str) -> bool {
    key.starts_with(RATING_PREFIX) || key.starts_with(COMMENTS_PREFIX)
}

pub fn comments(target_id: &str) -> String {
    format!("{COMMENTS_PREFIX}{target_id}")
}
