use crate::entities::NOT_AVAILABLE;
use crate::entities::facet::FacetRecord;
use crate::sources::rxnav::{AllRelatedResponse, BRAND_NAME_TTY, RxClassResponse};

fn or_na(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

/// Brand-name concepts (`tty == "BN"`) from a related-concepts response.
pub fn brands_from_all_related(drug_name: &str, resp: &AllRelatedResponse) -> Vec<FacetRecord> {
    let Some(group) = resp.all_related_group.as_ref() else {
        return Vec::new();
    };

    group
        .concept_group
        .iter()
        .filter(|g| g.tty.as_deref() == Some(BRAND_NAME_TTY))
        .flat_map(|g| g.concept_properties.iter())
        .map(|concept| FacetRecord {
            drug_name: drug_name.to_string(),
            value: or_na(concept.name.as_deref()),
            class_type: None,
        })
        .collect()
}

/// One record per class entry of an RxClass `byRxcui` response.
pub fn classes_from_rxclass(drug_name: &str, resp: &RxClassResponse) -> Vec<FacetRecord> {
    let Some(list) = resp.rxclass_drug_info_list.as_ref() else {
        return Vec::new();
    };

    list.rxclass_drug_info
        .iter()
        .map(|info| {
            let item = info.rxclass_min_concept_item.as_ref();
            FacetRecord {
                drug_name: drug_name.to_string(),
                value: or_na(item.and_then(|i| i.class_name.as_deref())),
                class_type: Some(or_na(item.and_then(|i| i.class_type.as_deref()))),
            }
        })
        .collect()
}
