use serde::{Deserialize, Serialize};

/// A generating station and the units that report under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantSite {
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub units: Vec<GenerationUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationUnit {
    /// Compound connection point, e.g. `"HLY2201 HLY1"`.
    pub node: String,
    #[serde(default)]
    pub fuel_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl GenerationUnit {
    /// Units without an explicit `active` flag are expected to report.
    pub fn is_expected_to_report(&self) -> bool {
        self.active.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstationEntry {
    pub site_id: String,
    pub lat: f64,
    pub long: f64,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: SubstationType,
    pub grid_zone: i32,
    pub island: Island,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubstationType {
    Acstn,
    Tee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Island {
    North,
    South,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_unit_defaults_to_active() {
        let plants: Vec<PlantSite> = serde_json::from_str(
            r#"[{"site":"HLY","units":[{"node":"HLY2201 HLY1","fuelCode":"gas"},{"node":"HLY2201 HLY2","fuelCode":"coal","active":false}]}]"#,
        )
        .unwrap();

        assert_eq!(plants[0].site, "HLY");
        assert!(plants[0].units[0].is_expected_to_report());
        assert!(!plants[0].units[1].is_expected_to_report());
        assert_eq!(plants[0].units[1].fuel_code, "coal");
    }

    #[test]
    fn substation_entry_uses_catalog_field_names() {
        let subs: Vec<SubstationEntry> = serde_json::from_str(
            r#"[{"siteId":"ABY","lat":-44.1,"long":170.9,"description":"Albury","type":"ACSTN","gridZone":12,"island":"south"}]"#,
        )
        .unwrap();

        assert_eq!(subs[0].site_id, "ABY");
        assert_eq!(subs[0].kind, SubstationType::Acstn);
        assert_eq!(subs[0].grid_zone, 12);
        assert_eq!(subs[0].island, Island::South);
    }

    #[test]
    fn substation_entry_rejects_unknown_type() {
        let res: Result<Vec<SubstationEntry>, _> = serde_json::from_str(
            r#"[{"siteId":"ABY","lat":0,"long":0,"description":"","type":"HVDC","gridZone":1,"island":"south"}]"#,
        );
        assert!(res.is_err());
    }
}
