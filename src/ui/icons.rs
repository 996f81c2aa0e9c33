pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const LINK: &str = "🔗";
    pub const DEL: &str = "🗑️";
    pub const DATABASE: &str = "🗄️";
    pub const ARTICLE: &str = "📄";
    pub const PERSON: &str = "👤";
    pub const PIN: &str = "📍";
    pub const TAG: &str = "🏷️";
    pub const SNIPPET: &str = "✂️";
    pub const GEAR: &str = "⚙️";
}

/// Icon for an entity kind as named in its table schema
pub fn for_entity(entity: &str) -> &'static str {
    match entity {
        "article" => Icons::ARTICLE,
        "author" => Icons::PERSON,
        "place" => Icons::PIN,
        "attrib" | "field" => Icons::TAG,
        "snippet" => Icons::SNIPPET,
        _ => Icons::INFO,
    }
}
