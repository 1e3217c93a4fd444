//! Human readable names for cluster centroids.

use serde::{Deserialize, Serialize};

/// How centroids are turned into names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorNaming {
    /// Nearest entry of the CSS3 named color table.
    #[default]
    CssNearest,
    /// Threshold ladder over brightness and dominant channel.
    RuleLadder,
}

impl ColorNaming {
    pub fn name(&self, rgb: [u8; 3]) -> String {
        match self {
            ColorNaming::CssNearest => nearest_css_name(rgb).to_string(),
            ColorNaming::RuleLadder => rule_ladder_name(rgb).to_string(),
        }
    }
}

/// CSS3 named colors. Spelling aliases collapse to `cyan`, `magenta` and the `gray` forms.
pub const CSS3_COLORS: &[(&str, [u8; 3])] = &[
    ("aliceblue", [240, 248, 255]),
    ("antiquewhite", [250, 235, 215]),
    ("aquamarine", [127, 255, 212]),
    ("azure", [240, 255, 255]),
    ("beige", [245, 245, 220]),
    ("bisque", [255, 228, 196]),
    ("black", [0, 0, 0]),
    ("blanchedalmond", [255, 235, 205]),
    ("blue", [0, 0, 255]),
    ("blueviolet", [138, 43, 226]),
    ("brown", [165, 42, 42]),
    ("burlywood", [222, 184, 135]),
    ("cadetblue", [95, 158, 160]),
    ("chartreuse", [127, 255, 0]),
    ("chocolate", [210, 105, 30]),
    ("coral", [255, 127, 80]),
    ("cornflowerblue", [100, 149, 237]),
    ("cornsilk", [255, 248, 220]),
    ("crimson", [220, 20, 60]),
    ("cyan", [0, 255, 255]),
    ("darkblue", [0, 0, 139]),
    ("darkcyan", [0, 139, 139]),
    ("darkgoldenrod", [184, 134, 11]),
    ("darkgray", [169, 169, 169]),
    ("darkgreen", [0, 100, 0]),
    ("darkkhaki", [189, 183, 107]),
    ("darkmagenta", [139, 0, 139]),
    ("darkolivegreen", [85, 107, 47]),
    ("darkorange", [255, 140, 0]),
    ("darkorchid", [153, 50, 204]),
    ("darkred", [139, 0, 0]),
    ("darksalmon", [233, 150, 122]),
    ("darkseagreen", [143, 188, 143]),
    ("darkslateblue", [72, 61, 139]),
    ("darkslategray", [47, 79, 79]),
    ("darkturquoise", [0, 206, 209]),
    ("darkviolet", [148, 0, 211]),
    ("deeppink", [255, 20, 147]),
    ("deepskyblue", [0, 191, 255]),
    ("dimgray", [105, 105, 105]),
    ("dodgerblue", [30, 144, 255]),
    ("firebrick", [178, 34, 34]),
    ("floralwhite", [255, 250, 240]),
    ("forestgreen", [34, 139, 34]),
    ("gainsboro", [220, 220, 220]),
    ("ghostwhite", [248, 248, 255]),
    ("gold", [255, 215, 0]),
    ("goldenrod", [218, 165, 32]),
    ("gray", [128, 128, 128]),
    ("green", [0, 128, 0]),
    ("greenyellow", [173, 255, 47]),
    ("honeydew", [240, 255, 240]),
    ("hotpink", [255, 105, 180]),
    ("indianred", [205, 92, 92]),
    ("indigo", [75, 0, 130]),
    ("ivory", [255, 255, 240]),
    ("khaki", [240, 230, 140]),
    ("lavender", [230, 230, 250]),
    ("lavenderblush", [255, 240, 245]),
    ("lawngreen", [124, 252, 0]),
    ("lemonchiffon", [255, 250, 205]),
    ("lightblue", [173, 216, 230]),
    ("lightcoral", [240, 128, 128]),
    ("lightcyan", [224, 255, 255]),
    ("lightgoldenrodyellow", [250, 250, 210]),
    ("lightgray", [211, 211, 211]),
    ("lightgreen", [144, 238, 144]),
    ("lightpink", [255, 182, 193]),
    ("lightsalmon", [255, 160, 122]),
    ("lightseagreen", [32, 178, 170]),
    ("lightskyblue", [135, 206, 250]),
    ("lightslategray", [119, 136, 153]),
    ("lightsteelblue", [176, 196, 222]),
    ("lightyellow", [255, 255, 224]),
    ("lime", [0, 255, 0]),
    ("limegreen", [50, 205, 50]),
    ("linen", [250, 240, 230]),
    ("magenta", [255, 0, 255]),
    ("maroon", [128, 0, 0]),
    ("mediumaquamarine", [102, 205, 170]),
    ("mediumblue", [0, 0, 205]),
    ("mediumorchid", [186, 85, 211]),
    ("mediumpurple", [147, 112, 219]),
    ("mediumseagreen", [60, 179, 113]),
    ("mediumslateblue", [123, 104, 238]),
    ("mediumspringgreen", [0, 250, 154]),
    ("mediumturquoise", [72, 209, 204]),
    ("mediumvioletred", [199, 21, 133]),
    ("midnightblue", [25, 25, 112]),
    ("mintcream", [245, 255, 250]),
    ("mistyrose", [255, 228, 225]),
    ("moccasin", [255, 228, 181]),
    ("navajowhite", [255, 222, 173]),
    ("navy", [0, 0, 128]),
    ("oldlace", [253, 245, 230]),
    ("olive", [128, 128, 0]),
    ("olivedrab", [107, 142, 35]),
    ("orange", [255, 165, 0]),
    ("orangered", [255, 69, 0]),
    ("orchid", [218, 112, 214]),
    ("palegoldenrod", [238, 232, 170]),
    ("palegreen", [152, 251, 152]),
    ("paleturquoise", [175, 238, 238]),
    ("palevioletred", [219, 112, 147]),
    ("papayawhip", [255, 239, 213]),
    ("peachpuff", [255, 218, 185]),
    ("peru", [205, 133, 63]),
    ("pink", [255, 192, 203]),
    ("plum", [221, 160, 221]),
    ("powderblue", [176, 224, 230]),
    ("purple", [128, 0, 128]),
    ("red", [255, 0, 0]),
    ("rosybrown", [188, 143, 143]),
    ("royalblue", [65, 105, 225]),
    ("saddlebrown", [139, 69, 19]),
    ("salmon", [250, 128, 114]),
    ("sandybrown", [244, 164, 96]),
    ("seagreen", [46, 139, 87]),
    ("seashell", [255, 245, 238]),
    ("sienna", [160, 82, 45]),
    ("silver", [192, 192, 192]),
    ("skyblue", [135, 206, 235]),
    ("slateblue", [106, 90, 205]),
    ("slategray", [112, 128, 144]),
    ("snow", [255, 250, 250]),
    ("springgreen", [0, 255, 127]),
    ("steelblue", [70, 130, 180]),
    ("tan", [210, 180, 140]),
    ("teal", [0, 128, 128]),
    ("thistle", [216, 191, 216]),
    ("tomato", [255, 99, 71]),
    ("turquoise", [64, 224, 208]),
    ("violet", [238, 130, 238]),
    ("wheat", [245, 222, 179]),
    ("white", [255, 255, 255]),
    ("whitesmoke", [245, 245, 245]),
    ("yellow", [255, 255, 0]),
    ("yellowgreen", [154, 205, 50]),
];

/// Nearest CSS3 name by squared RGB distance; the first minimum in table order wins.
pub fn nearest_css_name(rgb: [u8; 3]) -> &'static str {
    let mut best = ("gray", u32::MAX);
    for &(name, [r, g, b]) in CSS3_COLORS {
        let dr = r as i32 - rgb[0] as i32;
        let dg = g as i32 - rgb[1] as i32;
        let db = b as i32 - rgb[2] as i32;
        let dist = (dr * dr + dg * dg + db * db) as u32;
        if dist < best.1 {
            best = (name, dist);
        }
    }
    best.0
}

const MARGIN: i32 = 30;

/// Table-free naming. Falls back to the dominant channel rather than a catch-all.
pub fn rule_ladder_name(rgb: [u8; 3]) -> &'static str {
    let [r, g, b] = rgb.map(i32::from);

    if r > 200 && g > 200 && b > 200 {
        return "white";
    }
    if r < 50 && g < 50 && b < 50 {
        return "black";
    }
    if (r - g).abs() < MARGIN && (g - b).abs() < MARGIN && (r - b).abs() < MARGIN {
        return if r > 150 {
            "lightgray"
        } else if r > 100 {
            "gray"
        } else {
            "darkgray"
        };
    }

    if r > 150 && g > 150 && b < 100 {
        return "yellow";
    }
    if r > 150 && b > 150 && g < 100 {
        return "magenta";
    }
    if g > 150 && b > 150 && r < 100 {
        return "cyan";
    }
    if r > 200 && g > 100 && b < 50 {
        return "orange";
    }
    if r > 100 && g > 50 && b < 50 {
        return "brown";
    }
    if r > 200 && g > 150 && b > 150 {
        return "pink";
    }
    if r > 100 && b > 100 && g < 100 {
        return "purple";
    }

    if r > g + MARGIN && r > b + MARGIN {
        return if r > 200 { "red" } else { "darkred" };
    }
    if g > r + MARGIN && g > b + MARGIN {
        return if g > 200 { "lime" } else { "green" };
    }
    if b > r + MARGIN && b > g + MARGIN {
        return if b > 200 { "blue" } else { "darkblue" };
    }

    if r >= g && r >= b {
        "red"
    } else if g >= b {
        "green"
    } else {
        "blue"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn css_table_has_unique_entries() {
        let names: HashSet<_> = CSS3_COLORS.iter().map(|(n, _)| *n).collect();
        let values: HashSet<_> = CSS3_COLORS.iter().map(|(_, v)| *v).collect();
        assert_eq!(names.len(), CSS3_COLORS.len());
        assert_eq!(values.len(), CSS3_COLORS.len());
    }

    #[test]
    fn css_exact_and_nearest() {
        assert_eq!(nearest_css_name([255, 0, 0]), "red");
        assert_eq!(nearest_css_name([0, 0, 255]), "blue");
        assert_eq!(nearest_css_name([0, 255, 0]), "lime");
        assert_eq!(nearest_css_name([255, 255, 0]), "yellow");
        assert_eq!(nearest_css_name([0, 0, 0]), "black");
        assert_eq!(nearest_css_name([250, 2, 3]), "red");
        assert_eq!(nearest_css_name([1, 0, 130]), "navy");
    }

    #[test]
    fn ladder_brightness_and_grays() {
        assert_eq!(rule_ladder_name([230, 225, 240]), "white");
        assert_eq!(rule_ladder_name([10, 20, 30]), "black");
        assert_eq!(rule_ladder_name([170, 165, 160]), "lightgray");
        assert_eq!(rule_ladder_name([120, 125, 110]), "gray");
        assert_eq!(rule_ladder_name([70, 80, 90]), "darkgray");
    }

    #[test]
    fn ladder_dominant_channels() {
        assert_eq!(rule_ladder_name([230, 40, 40]), "red");
        assert_eq!(rule_ladder_name([150, 20, 30]), "darkred");
        assert_eq!(rule_ladder_name([30, 220, 40]), "lime");
        assert_eq!(rule_ladder_name([20, 140, 60]), "green");
        assert_eq!(rule_ladder_name([20, 40, 230]), "blue");
        assert_eq!(rule_ladder_name([10, 30, 120]), "darkblue");
        assert_eq!(rule_ladder_name([220, 210, 40]), "yellow");
        assert_eq!(rule_ladder_name([220, 30, 210]), "magenta");
        assert_eq!(rule_ladder_name([30, 200, 210]), "cyan");
        assert_eq!(rule_ladder_name([230, 140, 20]), "orange");
        assert_eq!(rule_ladder_name([140, 80, 30]), "brown");
        assert_eq!(rule_ladder_name([160, 40, 150]), "purple");
        assert_eq!(rule_ladder_name([250, 180, 190]), "pink");
    }

    #[test]
    fn ladder_never_returns_mixed() {
        for r in (0..=255).step_by(17) {
            for g in (0..=255).step_by(17) {
                for b in (0..=255).step_by(17) {
                    assert_ne!(rule_ladder_name([r as u8, g as u8, b as u8]), "mixed");
                }
            }
        }
    }
}
