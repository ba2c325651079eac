use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Reading,
    Time,
    Social,
    Collection,
    Secret,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }

    /// Gradient the badge is drawn with.
    pub fn colors(&self) -> &'static str {
        match self {
            Rarity::Common => "from-gray-400 to-gray-600",
            Rarity::Rare => "from-blue-400 to-blue-600",
            Rarity::Epic => "from-purple-400 to-purple-600",
            Rarity::Legendary => "from-yellow-400 to-orange-600",
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Icon {
    BookOpen,
    Fire,
    Crown,
    Clock,
    Coffee,
    Heart,
    Bolt,
    Ghost,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub threshold: u64,
    pub secret: bool,
    pub rarity: Rarity,
    pub icon: Icon,
}

const fn entry(
    id: &'static str,
    title: &'static str,
    description: &'static str,
    category: Category,
    threshold: u64,
    rarity: Rarity,
    icon: Icon,
) -> Achievement {
    Achievement {
        id,
        title,
        description,
        category,
        threshold,
        secret: false,
        rarity,
        icon,
    }
}

pub static ACHIEVEMENTS: [Achievement; 11] = [
    entry(
        "read_1",
        "بداية الرحلة",
        "قرأت أول فصل لك",
        Category::Reading,
        1,
        Rarity::Common,
        Icon::BookOpen,
    ),
    entry(
        "read_10",
        "دودة كتب",
        "قرأت 10 فصول",
        Category::Reading,
        10,
        Rarity::Common,
        Icon::BookOpen,
    ),
    entry(
        "read_50",
        "قارئ نهم",
        "قرأت 50 فصلاً",
        Category::Reading,
        50,
        Rarity::Rare,
        Icon::BookOpen,
    ),
    entry(
        "read_100",
        "أوتاكو حقيقي",
        "قرأت 100 فصل",
        Category::Reading,
        100,
        Rarity::Epic,
        Icon::Fire,
    ),
    entry(
        "read_1000",
        "ملك القراصنة",
        "قرأت 1000 فصل! أنت أسطورة!",
        Category::Reading,
        1000,
        Rarity::Legendary,
        Icon::Crown,
    ),
    entry(
        "time_1m",
        "نظرة سريعة",
        "قضيت دقيقة واحدة",
        Category::Time,
        60,
        Rarity::Common,
        Icon::Clock,
    ),
    entry(
        "time_1h",
        "تركيز عالي",
        "ساعة من القراءة",
        Category::Time,
        3600,
        Rarity::Rare,
        Icon::Coffee,
    ),
    entry(
        "time_24h",
        "مدمن مانجا",
        "يوم كامل في الموقع",
        Category::Time,
        86400,
        Rarity::Epic,
        Icon::Clock,
    ),
    entry(
        "fav_10",
        "جامع التحف",
        "10 مانجات في المفضلة",
        Category::Collection,
        10,
        Rarity::Rare,
        Icon::Heart,
    ),
    entry(
        "com_100",
        "المؤثر",
        "100 تعليق",
        Category::Social,
        100,
        Rarity::Epic,
        Icon::Bolt,
    ),
    Achievement {
        id: SECRET_NIGHT,
        title: "ساهر الليل",
        description: "قراءة بعد 3 فجراً",
        category: Category::Secret,
        threshold: 1,
        secret: true,
        rarity: Rarity::Epic,
        icon: Icon::Ghost,
    },
];

pub const SECRET_NIGHT: &str = "secret_night";

pub fn find_by_id(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Maps an achievement reported by the backend onto the registry, by id
/// first and by its Arabic display name otherwise.
pub fn find_remote(id: &str, name_ar: Option<&str>) -> Option<&'static Achievement> {
    find_by_id(id).or_else(|| {
        let name = name_ar?;
        ACHIEVEMENTS.iter().find(|a| a.title == name)
    })
}
