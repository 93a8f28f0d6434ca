use crate::profile::domain::profile_classifier::ProfileClassifier;
use crate::profile::infrastructure::category_config::CategoryConfig;
use crate::profile::infrastructure::description_store::DescriptionStore;
use crate::recognition::infrastructure::face_database::FaceDatabase;

/// Classifies enrolled people from their descriptions and stores the
/// resulting profile text in the face database.
pub struct AssignProfilesUseCase {
    classifier: ProfileClassifier,
    store: DescriptionStore,
}

impl AssignProfilesUseCase {
    /// Builds the classifier over the corpus of every description in
    /// `store`.
    pub fn new(
        categories: &CategoryConfig,
        store: DescriptionStore,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let corpus = store.corpus()?;
        let classifier = ProfileClassifier::new(&categories.categories, &corpus)?;
        Ok(Self { classifier, store })
    }

    /// Profile assigned to `name`, or `None` when there is no description
    /// for them. Records of unknown names are left untouched.
    pub fn execute(
        &self,
        database: &mut FaceDatabase,
        name: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let Some(description) = self.store.description_for(name)? else {
            log::info!("No description for {name}");
            return Ok(None);
        };
        let profile = self.classifier.classify(&description.words()).to_string();
        database.set_profile(name, &profile)?;
        log::info!("{name}: {profile}");
        Ok(Some(profile))
    }

    /// Runs [`Self::execute`] for every enrolled name. Returns how many
    /// people got a profile.
    pub fn execute_all(
        &self,
        database: &mut FaceDatabase,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let mut assigned = 0;
        for name in database.names() {
            if self.execute(database, &name)?.is_some() {
                assigned += 1;
            }
        }
        Ok(assigned)
    }
}
