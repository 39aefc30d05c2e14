//! Static task catalogs.
//!
//! Both catalogs are fixed at compile time and shared read-only by every
//! session; indices into [`LOOP_TASKS`] identify loop tasks and ids in
//! [`DAILY_TASKS`] identify daily tasks.

use serde::Serialize;

/// One stop on the customer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopTask {
    /// Short area name shown as the task title.
    pub area: &'static str,
    /// Where the photos for this task are taken.
    pub location: &'static str,
    /// What the associate is checking.
    pub description: &'static str,
    /// Individual checklist items.
    pub items: &'static [&'static str],
}

/// Priority of a daily task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Must be done every shift.
    High,
    /// Done when time allows.
    Medium,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High Priority"),
            Self::Medium => write!(f, "Medium Priority"),
        }
    }
}

/// One entry of the daily role guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyTask {
    /// Stable id, used as the key for notes and completion.
    pub id: u32,
    /// What to do.
    pub title: &'static str,
    /// Grouping used by the category filter.
    pub category: &'static str,
    /// Where the work happens.
    pub location: &'static str,
    /// How often it should happen.
    pub frequency: &'static str,
    /// How important it is.
    pub priority: Priority,
}

/// The customer loop, in walking order.
pub static LOOP_TASKS: &[LoopTask] = &[
    LoopTask {
        area: "Customer Restrooms",
        location: "Customer Restrooms",
        description: "Restrooms are clean, stocked and odor free",
        items: &[
            "Toilets and urinals clean",
            "Soap, paper towels and tissue stocked",
            "Floors dry and trash emptied",
        ],
    },
    LoopTask {
        area: "Store Interior",
        location: "Store Interior",
        description: "Aisles are clear and shelves faced",
        items: &[
            "Aisles free of boxes and spills",
            "Shelves faced and fronted",
            "Trash cans below half full",
        ],
    },
    LoopTask {
        area: "Exterior Areas",
        location: "Exterior Areas",
        description: "Lot and sidewalks free of litter and hazards",
        items: &[
            "Parking lot litter picked up",
            "Outside trash cans emptied",
            "Sidewalk clear of spills, ice and debris",
        ],
    },
    LoopTask {
        area: "Beverage Area",
        location: "Beverage Area",
        description: "Coffee and fountain stations clean and stocked",
        items: &[
            "Counters wiped and dry",
            "Cups, lids and condiments stocked",
            "Drip trays emptied",
        ],
    },
    LoopTask {
        area: "Sales Floor",
        location: "Sales Floor",
        description: "Floor swept and displays in order",
        items: &[
            "Floor swept and spot mopped",
            "End caps and displays tidy",
            "No trip hazards",
        ],
    },
    LoopTask {
        area: "Store Entrance",
        location: "Store Entrance",
        description: "Vestibule is dry and free of obstacles",
        items: &[
            "Mats straight and dry",
            "Glass doors cleaned",
            "Vestibule trash emptied",
        ],
    },
    LoopTask {
        area: "Front Entrance",
        location: "Front Entrance",
        description: "Front walkway presentable for customers",
        items: &[
            "Walkway swept",
            "Planters and landscaping tidy",
            "Signage clean and visible",
        ],
    },
    LoopTask {
        area: "Café Area",
        location: "Café Area",
        description: "Seating area clean and ready for customers",
        items: &[
            "Tables and chairs wiped",
            "Floor under seating swept",
            "Napkins and utensils stocked",
        ],
    },
];

/// Category names in display order; `All` matches every task.
pub static DAILY_CATEGORIES: &[&str] = &[
    ALL_CATEGORIES,
    "Restrooms",
    "Cold Box and Beer Cave",
    "Inside",
    "Outside (NJ - Fuel Associates)",
    "Fuel (if Fuel Store)",
    "Special Tasks",
];

/// The pseudo-category that disables filtering.
pub const ALL_CATEGORIES: &str = "All";

const COLD_BOX: &str = "Cold Box and Beer Cave";
const INSIDE: &str = "Inside";
const OUTSIDE: &str = "Outside (NJ - Fuel Associates)";
const FUEL: &str = "Fuel (if Fuel Store)";

const fn daily(
    id: u32,
    title: &'static str,
    category: &'static str,
    frequency: &'static str,
    priority: Priority,
) -> DailyTask {
    DailyTask {
        id,
        title,
        category,
        location: category,
        frequency,
        priority,
    }
}

/// The daily role guide.
pub static DAILY_TASKS: &[DailyTask] = &[
    daily(1, "Restroom Cleaning - 1st shift", "Restrooms", "1st shift only", Priority::High),
    daily(2, "Check holes and fill them first", COLD_BOX, "Multiple times per shift", Priority::High),
    daily(3, "Pack out cold box", COLD_BOX, "As needed throughout shift", Priority::High),
    daily(4, "Code and label checks", COLD_BOX, "Daily", Priority::High),
    daily(5, "Put away any orders, organize backstock, clean under racks", COLD_BOX, "Daily", Priority::High),
    daily(6, "Inside trash and cardboard breakdown", INSIDE, "Multiple times per shift", Priority::Medium),
    daily(7, "Maintain sales floor cleanliness, sweep, mop and spill cleanup", INSIDE, "Multiple times per shift", Priority::High),
    daily(8, "Clean vestibule, floor is dry and free of spills/obstacles", INSIDE, "Daily", Priority::Medium),
    daily(9, "Maintain backroom - including dry stock and backstock", INSIDE, "Daily", Priority::Medium),
    daily(10, "Outside trash", OUTSIDE, "Multiple times per shift", Priority::High),
    daily(11, "Sweep parking lot (including leaf blow when necessary)", OUTSIDE, "Daily", Priority::Medium),
    daily(12, "Clean landscaping", OUTSIDE, "Daily", Priority::Medium),
    daily(13, "Clean parking lot/porch/sidewalk for spills/ice/debris", OUTSIDE, "Multiple times per shift", Priority::High),
    daily(14, "Maintain trash area and shed", OUTSIDE, "Daily", Priority::Medium),
    daily(
        15,
        "Fuel Walk - ensure all pumps working, price sign/pump topper and pump price match, \
         video at pump is working, no unnecessary cones on court, fire extinguishers in code, \
         e-stop buttons labeled, check supplies: washer fluid, towels, squeegees",
        FUEL,
        "Multiple times per shift",
        Priority::High,
    ),
    daily(16, "Sweep Fuel Court and clean any fuel/oil spills", FUEL, "Multiple times per shift", Priority::High),
    daily(17, "Clean and Empty MPD trashcans", FUEL, "Daily", Priority::Medium),
    daily(18, "UST Spill Bucket Inspection", FUEL, "Daily", Priority::High),
    daily(19, "Check and Fill Spill Kits", FUEL, "Daily", Priority::Medium),
    daily(20, "Check GRinD and Fill Paper", FUEL, "Daily", Priority::Medium),
    daily(21, "Check Air Pump", FUEL, "Daily", Priority::Medium),
    daily(22, "Complete fuel compliance on MyWawa", FUEL, "Daily", Priority::High),
];

/// Number of tasks in one customer loop.
#[must_use]
pub fn loop_task_count() -> usize {
    LOOP_TASKS.len()
}

/// Look up a loop task by index.
#[must_use]
pub fn loop_task(index: usize) -> Option<&'static LoopTask> {
    LOOP_TASKS.get(index)
}

/// Look up a daily task by id.
#[must_use]
pub fn daily_task(id: u32) -> Option<&'static DailyTask> {
    DAILY_TASKS.iter().find(|task| task.id == id)
}

/// Daily tasks in `category`, or all of them for `None` / `"All"`.
pub fn daily_tasks_in(category: Option<&str>) -> impl Iterator<Item = &'static DailyTask> + '_ {
    DAILY_TASKS.iter().filter(move |task| match category {
        None => true,
        Some(c) if c.eq_ignore_ascii_case(ALL_CATEGORIES) => true,
        Some(c) => task.category.eq_ignore_ascii_case(c),
    })
}
