//! SVG rendering for faction badges. Pure string templating: the same input
//! always produces the same bytes, which the test suite relies on.

use crate::models::user::Faction;

/// Visual attributes of a faction state.
struct Theme {
    label: &'static str,
    tagline: &'static str,
    color: &'static str,
}

fn theme(faction: Option<Faction>) -> Theme {
    match faction {
        Some(Faction::A) => Theme {
            label: "Faction A",
            tagline: "Sworn to Faction A",
            color: "#e05d44",
        },
        Some(Faction::B) => Theme {
            label: "Faction B",
            tagline: "Sworn to Faction B",
            color: "#007ec6",
        },
        None => Theme {
            label: "Undecided",
            tagline: "No faction chosen yet",
            color: "#9f9f9f",
        },
    }
}

/// Compact badge, shields.io proportions. Left half is a fixed "faction"
/// label, right half carries the state.
pub fn badge(faction: Option<Faction>) -> String {
    let theme = theme(faction);
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="150" height="20" role="img" aria-label="faction: {label}">
  <rect width="62" height="20" fill="#555"/>
  <rect x="62" width="88" height="20" fill="{color}"/>
  <g fill="#fff" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" font-size="11">
    <text x="31" y="14">faction</text>
    <text x="106" y="14">{label}</text>
  </g>
</svg>
"##,
        label = theme.label,
        color = theme.color,
    )
}

/// Larger card variant for embedding in profiles. Same state resolution as
/// the badge, different layout constants and text.
pub fn card(faction: Option<Faction>) -> String {
    let theme = theme(faction);
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="360" height="120" role="img" aria-label="faction card: {label}">
  <rect width="360" height="120" rx="8" fill="#1c1c1e"/>
  <rect x="0" y="0" width="8" height="120" rx="4" fill="{color}"/>
  <circle cx="56" cy="60" r="26" fill="{color}"/>
  <g font-family="Verdana,Geneva,DejaVu Sans,sans-serif">
    <text x="100" y="52" fill="#fff" font-size="22" font-weight="bold">{label}</text>
    <text x="100" y="82" fill="#b0b0b8" font-size="13">{tagline}</text>
  </g>
</svg>
"##,
        label = theme.label,
        tagline = theme.tagline,
        color = theme.color,
    )
}
