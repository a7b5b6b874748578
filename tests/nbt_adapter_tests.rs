//! NBT capability tests (through the Compat facade)

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use voxel_compat::mock::MemoryHost;
    use voxel_compat::nbt::{Compound, Tag};
    use voxel_compat::{Compat, CompatConfig, CompatError, ItemStack, ItemTag, NbtError};

    const VERSIONS: [&str; 5] = ["1_8_R3", "1_12_R1", "1_13_R2", "1_16_R3", "1_17_R1"];

    fn compat(version: &str) -> Compat {
        let host = Arc::new(MemoryHost::for_version(version));
        Compat::bootstrap(host, CompatConfig::default()).unwrap()
    }

    fn tagged_sword() -> ItemStack {
        let mut display = Compound::new();
        display.insert("Name", "Excalibur");
        let mut tag = Compound::new();
        tag.insert("display", display);
        tag.insert("CustomModelData", 7);
        tag.insert("Enchantments", Tag::List(vec![Tag::from("sharpness")]));
        ItemStack::new("DIAMOND_SWORD", 1).with_tag(tag)
    }

    // -----------------------------------------------------------------------
    // get
    // -----------------------------------------------------------------------

    #[test]
    fn untagged_item_reads_as_empty_compound() {
        for version in VERSIONS {
            let compat = compat(version);
            let tag = compat.nbt_get(&ItemStack::new("STONE", 64)).unwrap();
            assert_eq!(tag, ItemTag::empty(), "{}", version);
        }
    }

    #[test]
    fn get_uses_the_revision_dialect() {
        let legacy = compat("1_8_R3").nbt_get(&tagged_sword()).unwrap();
        assert_eq!(
            legacy.as_str(),
            r#"{CustomModelData:7,Enchantments:[0:"sharpness"],display:{Name:"Excalibur"}}"#
        );

        let modern = compat("1_16_R3").nbt_get(&tagged_sword()).unwrap();
        assert_eq!(
            modern.as_str(),
            r#"{CustomModelData:7,Enchantments:["sharpness"],display:{Name:"Excalibur"}}"#
        );
    }

    // -----------------------------------------------------------------------
    // set
    // -----------------------------------------------------------------------

    #[test]
    fn set_of_get_is_identity_on_every_revision() {
        for version in VERSIONS {
            let compat = compat(version);
            let item = tagged_sword();
            let tag = compat.nbt_get(&item).unwrap();
            let again = compat.nbt_set(&item, &tag).unwrap();
            assert_eq!(again, item, "{}", version);
        }
    }

    #[test]
    fn set_merges_and_keeps_unknown_keys() {
        let compat = compat("1_12_R1");
        let patched = compat
            .nbt_set(&tagged_sword(), &ItemTag::new(r#"{display:{Lore:["forged"]}}"#))
            .unwrap();

        assert_eq!(
            compat.nbt_get(&patched).unwrap().as_str(),
            r#"{CustomModelData:7,Enchantments:["sharpness"],display:{Lore:["forged"],Name:"Excalibur"}}"#
        );
        assert_eq!(patched.material, "DIAMOND_SWORD");
        assert_eq!(patched.amount, 1);
    }

    #[test]
    fn set_replaces_non_compound_values() {
        let compat = compat("1_17_R1");
        let patched = compat
            .nbt_set(&tagged_sword(), &ItemTag::new("{CustomModelData:9,Enchantments:[]}"))
            .unwrap();
        let tag = patched.tag.unwrap();
        assert_eq!(tag.get("CustomModelData"), Some(&Tag::Int(9)));
        assert_eq!(tag.get("Enchantments"), Some(&Tag::List(vec![])));
    }

    #[test]
    fn primitives_round_trip_exactly() {
        let compat = compat("1_16_R3");
        let input = r#"{b:-3b,d:2.25d,f:1.5f,i:123456,l:9000000000L,s:-300s,str:"it's"}"#;
        let item = compat
            .nbt_set(&ItemStack::new("PAPER", 1), &ItemTag::new(input))
            .unwrap();
        let tag = item.tag.clone().unwrap();

        assert_eq!(tag.get("b"), Some(&Tag::Byte(-3)));
        assert_eq!(tag.get("s"), Some(&Tag::Short(-300)));
        assert_eq!(tag.get("i"), Some(&Tag::Int(123456)));
        assert_eq!(tag.get("l"), Some(&Tag::Long(9_000_000_000)));
        assert_eq!(tag.get("f"), Some(&Tag::Float(1.5)));
        assert_eq!(tag.get("d"), Some(&Tag::Double(2.25)));
        assert_eq!(tag.get("str"), Some(&Tag::from("it's")));

        let written = compat.nbt_get(&item).unwrap();
        let reread = compat.nbt_set(&ItemStack::new("PAPER", 1), &written).unwrap();
        assert_eq!(reread, item);
    }

    #[test]
    fn empty_patch_on_untagged_item_leaves_no_tag() {
        let compat = compat("1_13_R2");
        let item = compat
            .nbt_set(&ItemStack::new("STONE", 1), &ItemTag::empty())
            .unwrap();
        assert_eq!(item.tag, None);
    }

    #[test]
    fn malformed_tag_is_an_nbt_error() {
        let compat = compat("1_17_R1");
        let item = tagged_sword();
        for bad in ["{display:", "not a tag", "[1,2]", "{a:[1,\"x\"]}"] {
            let err = compat.nbt_set(&item, &ItemTag::new(bad)).unwrap_err();
            assert!(matches!(err, CompatError::Nbt(_)), "{}: {:?}", bad, err);
        }
    }

    #[test]
    fn deeply_nested_tag_is_an_nbt_error() {
        let compat = compat("1_16_R3");
        let deep = format!("{{a:{}1{}}}", "[".repeat(200_000), "]".repeat(200_000));
        let err = compat
            .nbt_set(&ItemStack::new("STONE", 1), &ItemTag::new(deep))
            .unwrap_err();
        assert!(matches!(err, CompatError::Nbt(NbtError::TooDeep { limit: 512, .. })));
    }
}
