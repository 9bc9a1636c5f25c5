//! Flattening of value files into per-(entity, version, parameter) records

use indexmap::IndexSet;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{DescriptionScope, LayoutConfig, TelescopeFamily};
use crate::db::schemas::{DescriptionRecord, ValueRecord};
use crate::db::CollectionKind;
use crate::ingest::descriptions::Descriptions;
use crate::ingest::files::FileCollector;
use crate::ingest::inference::infer_type;
use crate::ingest::reader::{read_entity_values, EntityValues, RawValue};
use crate::types::{LoaderError, Result};

/// Records and data files produced for one collection pair
#[derive(Clone, Debug, Default)]
pub struct BuiltRecords {
    pub values: Vec<ValueRecord>,
    pub descriptions: Vec<DescriptionRecord>,
    pub files: FileCollector,
}

/// Where a single value record comes from
struct RecordSource<'s> {
    collection: CollectionKind,
    entity: &'s str,
    /// Name used for description lookup
    lookup: &'s str,
    /// Name stored in the `Parameter` field
    stored: &'s str,
    version: &'s str,
    applicable: bool,
    raw: &'s RawValue,
}

pub struct RecordBuilder<'a> {
    root: &'a Path,
    layout: &'a LayoutConfig,
    descriptions: &'a Descriptions,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(root: &'a Path, layout: &'a LayoutConfig, descriptions: &'a Descriptions) -> Self {
        Self {
            root,
            layout,
            descriptions,
        }
    }

    fn value_record(
        &self,
        source: RecordSource<'_>,
        extensions: &[String],
        files: &mut FileCollector,
    ) -> ValueRecord {
        let value_type = infer_type(self.descriptions, source.lookup, source.raw);

        let file = extensions
            .iter()
            .any(|ext| source.raw.as_str().contains(ext.as_str()));
        // Default-version references are symbolic, only dated versions ship files
        if file && source.version != self.layout.default_version {
            files.add(self.layout.data_file_path(self.root, source.raw.as_str()));
        }

        let (telescope, site) = match source.collection {
            CollectionKind::Telescopes => (Some(source.entity.to_string()), None),
            CollectionKind::Sites => (None, Some(source.entity.to_string())),
        };

        ValueRecord {
            telescope,
            site,
            parameter: source.stored.to_string(),
            applicable: source.applicable,
            version: source.version.to_string(),
            value_type: value_type.tag().to_string(),
            value: value_type.coerce(source.raw),
            file,
            attributes: self
                .descriptions
                .get(source.lookup)
                .map(|d| d.attributes.clone())
                .unwrap_or_default(),
        }
    }

    fn description_record(&self, lookup: &str, stored: &str) -> DescriptionRecord {
        let text = match self.descriptions.get(lookup) {
            Some(description) => description.text.clone(),
            None => {
                debug!(parameter = lookup, "No description available");
                Default::default()
            }
        };
        DescriptionRecord::new(stored, text)
    }

    /// Value records for every variant of one telescope family at one site.
    ///
    /// Versions missing for a parameter are skipped, not defaulted.
    pub fn telescope_family_records(
        &self,
        site: &str,
        family: &TelescopeFamily,
        values: &EntityValues,
        files: &mut FileCollector,
    ) -> Result<Vec<ValueRecord>> {
        let versions = values.version_labels(&self.layout.telescope_version_reference)?;
        let mut records = Vec::new();

        for variant in &family.variants {
            let entity = format!("{}-{}-{}", site, family.family, variant);
            for version in &versions {
                for (parameter, parameter_values) in values.parameters() {
                    let Some(raw) = parameter_values.get(version) else {
                        continue;
                    };
                    let source = RecordSource {
                        collection: CollectionKind::Telescopes,
                        entity: &entity,
                        lookup: parameter,
                        stored: parameter,
                        version,
                        applicable: parameter_values.applicable,
                        raw,
                    };
                    records.push(self.value_record(
                        source,
                        &self.layout.telescope_file_extensions,
                        files,
                    ));
                }
            }
        }

        Ok(records)
    }

    /// Build value and description records for the whole telescope layout
    pub fn build_telescopes(&self, scope: DescriptionScope) -> Result<BuiltRecords> {
        let mut built = BuiltRecords::default();
        let mut described: IndexSet<String> = IndexSet::new();

        for site in &self.layout.sites {
            for family in &site.telescopes {
                info!(
                    "Preparing input for {} {} telescopes in the {}",
                    family.variants.len(),
                    family.family,
                    site.site
                );
                let values = read_entity_values(self.root, &family.family, self.layout)?;
                let records =
                    self.telescope_family_records(&site.site, family, &values, &mut built.files)?;
                built.values.extend(records);

                let names = values.parameter_names().map(str::to_string);
                match scope {
                    DescriptionScope::LastEntity => described = names.collect(),
                    DescriptionScope::AllEntities => described.extend(names),
                }
            }
        }

        info!(count = described.len(), "Preparing description entries");
        built.descriptions = described
            .iter()
            .map(|parameter| self.description_record(parameter, parameter))
            .collect();

        Ok(built)
    }

    /// Split `lapalma_altitude` into (`North`, `altitude`)
    pub fn split_site_parameter<'p>(&self, parameter: &'p str) -> Result<(&'a str, &'p str)> {
        let (prefix, name) = parameter.split_once('_').unwrap_or((parameter, ""));
        let site = self.layout.site_prefixes.get(prefix).ok_or_else(|| {
            LoaderError::InvalidInput(format!(
                "site parameter {} has unknown site prefix {}",
                parameter, prefix
            ))
        })?;
        Ok((site.as_str(), name))
    }

    /// Value records of the site group file
    pub fn site_records(
        &self,
        values: &EntityValues,
        files: &mut FileCollector,
    ) -> Result<Vec<ValueRecord>> {
        let versions = values.version_labels(&self.layout.site_version_reference)?;
        let mut records = Vec::new();

        for version in &versions {
            for (parameter, parameter_values) in values.parameters() {
                let Some(raw) = parameter_values.get(version) else {
                    continue;
                };
                let (site, name) = self.split_site_parameter(parameter)?;
                let source = RecordSource {
                    collection: CollectionKind::Sites,
                    entity: site,
                    lookup: parameter,
                    stored: name,
                    version,
                    applicable: parameter_values.applicable,
                    raw,
                };
                records.push(self.value_record(source, &self.layout.site_file_extensions, files));
            }
        }

        Ok(records)
    }

    /// Build value and description records for the sites
    pub fn build_sites(&self) -> Result<BuiltRecords> {
        info!("Preparing sites DB");
        let values = read_entity_values(self.root, &self.layout.site_group, self.layout)?;

        let mut built = BuiltRecords::default();
        built.values = self.site_records(&values, &mut built.files)?;

        built.descriptions = values
            .parameter_names()
            .map(|parameter| {
                let (_, name) = self.split_site_parameter(parameter)?;
                Ok(self.description_record(parameter, name))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteLayout;
    use crate::db::ParameterValue;
    use crate::ingest::descriptions::Description;
    use std::path::PathBuf;

    fn descriptions() -> Descriptions {
        let mut descriptions = Descriptions::default();
        descriptions.insert(
            "alt",
            Description {
                value_type: Some("double".into()),
                ..Default::default()
            },
        );
        descriptions.insert(
            "paranal_altitude",
            Description {
                value_type: Some("double".into()),
                ..Default::default()
            },
        );
        descriptions
    }

    fn lst_values(yaml: &str) -> EntityValues {
        EntityValues::from_yaml("LST", Path::new("parValues-LST.yml"), yaml).unwrap()
    }

    fn layout() -> LayoutConfig {
        LayoutConfig {
            telescope_version_reference: "alt".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_double_scenario() {
        let layout = layout();
        let descriptions = descriptions();
        let builder = RecordBuilder::new(Path::new("/model"), &layout, &descriptions);
        let values = lst_values("alt:\n  Applicable: true\n  \"2020-01-01\": \"1800.5\"\n");

        let mut files = FileCollector::new();
        let family = TelescopeFamily::new("LST", &["1"]);
        let records = builder
            .telescope_family_records("North", &family, &values, &mut files)
            .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.telescope.as_deref(), Some("North-LST-1"));
        assert_eq!(record.parameter, "alt");
        assert_eq!(record.version, "2020-01-01");
        assert_eq!(record.value_type, "<class 'float'>");
        assert_eq!(record.value, ParameterValue::Float(1800.5));
        assert!(record.applicable);
        assert!(!record.file);
        assert!(files.is_empty());
    }

    #[test]
    fn test_untyped_value_kept_verbatim() {
        let layout = layout();
        let descriptions = descriptions();
        let builder = RecordBuilder::new(Path::new("/model"), &layout, &descriptions);
        let values = lst_values(
            "alt:\n  Applicable: true\n  default: 1\nlabel:\n  Applicable: true\n  default: \" 0042 \"\n",
        );

        let mut files = FileCollector::new();
        let records = builder
            .telescope_family_records("North", &TelescopeFamily::new("LST", &["1"]), &values, &mut files)
            .unwrap();
        let label = records.iter().find(|r| r.parameter == "label").unwrap();
        assert_eq!(label.value, ParameterValue::Text(" 0042 ".into()));
        assert_eq!(label.value_type, "<class 'str'>");
    }

    #[test]
    fn test_yaml_typed_values() {
        let layout = layout();
        let mut descriptions = descriptions();
        descriptions.insert(
            "num_gains",
            Description {
                value_type: Some("int".into()),
                ..Default::default()
            },
        );
        let builder = RecordBuilder::new(Path::new("/model"), &layout, &descriptions);
        let values = lst_values(
            "alt:\n  Applicable: true\n  default: 1\nnum_gains:\n  Applicable: true\n  default: 2.0\ndisable_trigger:\n  Applicable: false\n  default: true\n",
        );

        let mut files = FileCollector::new();
        let records = builder
            .telescope_family_records("North", &TelescopeFamily::new("LST", &["1"]), &values, &mut files)
            .unwrap();

        let gains = records.iter().find(|r| r.parameter == "num_gains").unwrap();
        assert_eq!(gains.value, ParameterValue::Int(2));
        assert_eq!(gains.value_type, "<class 'int'>");

        let flag = records.iter().find(|r| r.parameter == "disable_trigger").unwrap();
        assert_eq!(flag.value, ParameterValue::Text("True".into()));
        assert_eq!(flag.value_type, "<class 'str'>");
    }

    #[test]
    fn test_sparse_versions_are_skipped() {
        let layout = layout();
        let descriptions = descriptions();
        let builder = RecordBuilder::new(Path::new("/model"), &layout, &descriptions);
        let values = lst_values(
            r#"
alt:
  Applicable: true
  default: 1
  2020-06-28: 2
gain:
  Applicable: true
  default: 5
"#,
        );

        let mut files = FileCollector::new();
        let records = builder
            .telescope_family_records(
                "South",
                &TelescopeFamily::new("LST", &["D"]),
                &values,
                &mut files,
            )
            .unwrap();

        assert_eq!(records.len(), 3);
        assert!(!records
            .iter()
            .any(|r| r.parameter == "gain" && r.version == "2020-06-28"));
    }

    #[test]
    fn test_file_references_only_queued_for_dated_versions() {
        let layout = layout();
        let descriptions = descriptions();
        let builder = RecordBuilder::new(Path::new("/model"), &layout, &descriptions);
        let values = lst_values(
            r#"
alt:
  Applicable: true
  default: 1
  2020-06-28: 1
mirror_list:
  Applicable: true
  default: mirror_list.dat
  2020-06-28: mirror_list.dat
camera_config:
  Applicable: true
  default: camera.txt
"#,
        );

        let mut files = FileCollector::new();
        let records = builder
            .telescope_family_records("North", &TelescopeFamily::new("LST", &["1"]), &values, &mut files)
            .unwrap();

        let mirrors: Vec<_> = records.iter().filter(|r| r.parameter == "mirror_list").collect();
        assert_eq!(mirrors.len(), 2);
        assert!(mirrors.iter().all(|r| r.file));
        assert!(records.iter().find(|r| r.parameter == "camera_config").unwrap().file);

        assert_eq!(files.len(), 1);
        assert!(files.contains(&PathBuf::from("/model/datFiles/mirror_list.dat")));
    }

    #[test]
    fn test_variants_get_distinct_identities() {
        let layout = layout();
        let descriptions = descriptions();
        let builder = RecordBuilder::new(Path::new("/model"), &layout, &descriptions);
        let values = lst_values("alt:\n  Applicable: true\n  default: 1\n");

        let mut files = FileCollector::new();
        let records = builder
            .telescope_family_records(
                "North",
                &TelescopeFamily::new("LST", &["1", "D234"]),
                &values,
                &mut files,
            )
            .unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.entity()).collect();
        assert_eq!(ids, vec!["North-LST-1", "North-LST-D234"]);
    }

    #[test]
    fn test_site_records_split_prefix() {
        let layout = LayoutConfig::default();
        let descriptions = descriptions();
        let builder = RecordBuilder::new(Path::new("/model"), &layout, &descriptions);
        let values = EntityValues::from_yaml(
            "Sites",
            Path::new("parValues-Sites.yml"),
            r#"
paranal_altitude:
  Applicable: true
  default: 2150
  2020-06-28: 2150
lapalma_atmospheric_profile:
  Applicable: true
  default: atm_trans_2156_1_3_0_0_0.1_0.1.lis
  2020-06-28: atmprof_ecmwf_north_winter_fixed.dat
"#,
        )
        .unwrap();

        let mut files = FileCollector::new();
        let records = builder.site_records(&values, &mut files).unwrap();
        assert_eq!(records.len(), 4);

        let altitude = &records[0];
        assert_eq!(altitude.site.as_deref(), Some("South"));
        assert_eq!(altitude.parameter, "altitude");
        assert_eq!(altitude.value, ParameterValue::Float(2150.0));

        let profile = records
            .iter()
            .find(|r| r.parameter == "atmospheric_profile" && r.version == "default")
            .unwrap();
        assert_eq!(profile.site.as_deref(), Some("North"));
        assert!(profile.file);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_unknown_site_prefix_fails() {
        let layout = LayoutConfig::default();
        let descriptions = descriptions();
        let builder = RecordBuilder::new(Path::new("/model"), &layout, &descriptions);
        assert!(builder.split_site_parameter("tenerife_altitude").is_err());
        assert_eq!(
            builder.split_site_parameter("lapalma_geomag_horizontal").unwrap(),
            ("North", "geomag_horizontal")
        );
    }

    fn write_value_file(root: &Path, name: &str, body: &str) {
        let dir = root.join("configReports");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("parValues-{}.yml", name)), body).unwrap();
    }

    #[test]
    fn test_description_scope() {
        let tmp = tempfile::tempdir().unwrap();
        write_value_file(tmp.path(), "LST", "alt:\n  Applicable: true\n  default: 1\nlst_only:\n  Applicable: true\n  default: 2\n");
        write_value_file(tmp.path(), "SCT", "alt:\n  Applicable: true\n  default: 1\n");

        let layout = LayoutConfig {
            telescope_version_reference: "alt".into(),
            sites: vec![SiteLayout {
                site: "South".into(),
                telescopes: vec![
                    TelescopeFamily::new("LST", &["D"]),
                    TelescopeFamily::new("SCT", &["D"]),
                ],
            }],
            ..Default::default()
        };
        let descriptions = descriptions();
        let builder = RecordBuilder::new(tmp.path(), &layout, &descriptions);

        let last = builder.build_telescopes(DescriptionScope::LastEntity).unwrap();
        assert_eq!(last.values.len(), 3);
        let names: Vec<_> = last.descriptions.iter().map(|d| d.parameter.as_str()).collect();
        assert_eq!(names, vec!["alt"]);

        let all = builder.build_telescopes(DescriptionScope::AllEntities).unwrap();
        let names: Vec<_> = all.descriptions.iter().map(|d| d.parameter.as_str()).collect();
        assert_eq!(names, vec!["alt", "lst_only"]);
    }
}
