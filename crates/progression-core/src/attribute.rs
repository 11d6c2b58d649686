use contracts::{AttributeKind, TaskCategory, XP_PER_ATTRIBUTE_POINT};

/// Fixed category-to-attribute mapping. Vitality has no feeding category;
/// it only moves when a caller seeds it directly.
pub fn attribute_for_category(category: TaskCategory) -> AttributeKind {
    match category {
        TaskCategory::Health => AttributeKind::Strength,
        TaskCategory::Work => AttributeKind::Wisdom,
        TaskCategory::Creativity => AttributeKind::Dexterity,
        TaskCategory::Social => AttributeKind::Charisma,
        TaskCategory::Learning => AttributeKind::Intelligence,
    }
}

/// Attribute points earned by an XP award: one point per ten XP, floored.
/// A zero gain is a valid no-op contribution, not an error.
pub fn derive_attribute_gain(category: TaskCategory, xp_awarded: i64) -> (AttributeKind, i64) {
    let attribute = attribute_for_category(category);
    let gain = (xp_awarded / XP_PER_ATTRIBUTE_POINT).max(0);
    (attribute, gain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_fixed() {
        assert_eq!(
            attribute_for_category(TaskCategory::Health),
            AttributeKind::Strength
        );
        assert_eq!(
            attribute_for_category(TaskCategory::Work),
            AttributeKind::Wisdom
        );
        assert_eq!(
            attribute_for_category(TaskCategory::Creativity),
            AttributeKind::Dexterity
        );
        assert_eq!(
            attribute_for_category(TaskCategory::Social),
            AttributeKind::Charisma
        );
        assert_eq!(
            attribute_for_category(TaskCategory::Learning),
            AttributeKind::Intelligence
        );
    }

    #[test]
    fn gain_is_floored_tenth() {
        assert_eq!(
            derive_attribute_gain(TaskCategory::Health, 150),
            (AttributeKind::Strength, 15)
        );
        assert_eq!(
            derive_attribute_gain(TaskCategory::Learning, 19),
            (AttributeKind::Intelligence, 1)
        );
        assert_eq!(
            derive_attribute_gain(TaskCategory::Social, 9),
            (AttributeKind::Charisma, 0)
        );
    }
}
