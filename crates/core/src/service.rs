use crate::error::{FixerError, FixerErrorExt};
use crate::fixer::Fixer;
use crate::import;
use crate::store::RuleStore;
use crate::url::{extract_domain, extract_urls, first_url, remove_query_params};
use tracing::{debug, info};

/// A URL found in a message together with its corrected form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLink {
    /// The URL exactly as it appeared in the text.
    pub original: String,
    pub fixed: String,
}

/// A rule definition as it arrives from an administrative request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleRequest {
    Replace { old: String, new: String },
    RegexReplace { pattern: String, replacement: String },
    Prepend { prefix: String },
}

impl From<RuleRequest> for Fixer {
    fn from(request: RuleRequest) -> Self {
        match request {
            RuleRequest::Replace { old, new } => Self::Replace { old, new },
            RuleRequest::RegexReplace { pattern, replacement } => {
                Self::RegexReplace { pattern, replacement }
            },
            RuleRequest::Prepend { prefix } => Self::Prepend { prefix },
        }
    }
}

/// A rule as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub namespace: String,
    pub domain: String,
    pub fixer: Fixer,
}

/// The contract between the rule core and whatever delivers messages and commands.
#[derive(Debug, Clone)]
pub struct LinkFixer {
    store: RuleStore,
}

impl LinkFixer {
    #[must_use]
    pub const fn new(store: RuleStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub const fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Fixes the first URL in `text` if its domain has a rule in `namespace`.
    ///
    /// Query parameters are dropped before the fixer runs. Text without a URL, or with a
    /// URL whose domain cannot be extracted, never reaches the store. A rule that yields an
    /// empty link (such as a stored regex that no longer compiles) counts as no fix.
    ///
    /// # Errors
    /// [`FixerError::Store`] when the stored rule is unreadable.
    pub fn fix_message(&self, namespace: &str, text: &str) -> Result<Option<FixedLink>, FixerError> {
        match first_url(text) {
            Some(url) => self.fix_url(namespace, url),
            None => Ok(None),
        }
    }

    /// Like [`Self::fix_message`] but for every URL in `text`, in order of appearance.
    ///
    /// # Errors
    /// As for [`Self::fix_message`].
    pub fn fix_all(&self, namespace: &str, text: &str) -> Result<Vec<FixedLink>, FixerError> {
        extract_urls(text).filter_map(|url| self.fix_url(namespace, url).transpose()).collect()
    }

    fn fix_url(&self, namespace: &str, url: &str) -> Result<Option<FixedLink>, FixerError> {
        let stripped = remove_query_params(url);
        let domain = extract_domain(stripped);
        if domain.is_empty() {
            return Ok(None);
        }

        let Some(fixer) = self.store.get(namespace, &domain).context("looking up rule")? else {
            return Ok(None);
        };

        let fixed = fixer.fix(stripped);
        if fixed.is_empty() {
            debug!(namespace, %domain, "Fixer produced no link");
            return Ok(None);
        }
        debug!(namespace, %domain, "Link fixed");
        Ok(Some(FixedLink { original: url.to_owned(), fixed }))
    }

    /// Validates `request` and stores it for the domain of `domain_or_url`.
    ///
    /// # Errors
    /// [`FixerError::Validation`] for an empty namespace, an unusable domain or empty
    /// fields, [`FixerError::Pattern`] for a bad regex, [`FixerError::Store`] on I/O.
    pub async fn register_rule(
        &self,
        namespace: &str,
        domain_or_url: &str,
        request: RuleRequest,
    ) -> Result<Rule, FixerError> {
        let domain = normalize(namespace, domain_or_url)?;
        let fixer = Fixer::from(request);
        fixer.validate()?;

        self.store.put(namespace, &domain, &fixer).await.context("registering rule")?;
        info!(namespace, %domain, fixer = %fixer, "Rule registered");

        Ok(Rule { namespace: namespace.to_owned(), domain, fixer })
    }

    /// `(domain, description)` pairs of `namespace`, sorted by domain.
    ///
    /// # Errors
    /// [`FixerError::Store`] when a stored rule is unreadable.
    pub fn list_rules(&self, namespace: &str) -> Result<Vec<(String, String)>, FixerError> {
        let rules = self.store.list(namespace).context("listing rules")?;
        Ok(rules.into_iter().map(|(domain, fixer)| (domain, fixer.describe())).collect())
    }

    /// Removes the rule for the domain of `domain_or_url`. Missing rules are fine.
    ///
    /// # Errors
    /// [`FixerError::Validation`] for an unusable domain, [`FixerError::Store`] on I/O.
    pub async fn delete_rule(&self, namespace: &str, domain_or_url: &str) -> Result<String, FixerError> {
        let domain = normalize(namespace, domain_or_url)?;
        self.store.delete(namespace, &domain).await.context("deleting rule")?;
        info!(namespace, %domain, "Rule deleted");
        Ok(domain)
    }

    /// Registers every rule of a bulk import in one commit.
    ///
    /// # Errors
    /// [`FixerError::Import`] for the first malformed line; no rule is stored then.
    pub async fn import_rules(&self, namespace: &str, text: &str) -> Result<usize, FixerError> {
        if namespace.is_empty() {
            return Err(FixerError::validation("namespace must not be empty"));
        }

        let rules = import::parse_rules(text)?;
        let count =
            self.store.put_many(namespace, rules.into_iter().collect()).await.context("importing rules")?;
        info!(namespace, count, "Rules imported");

        Ok(count)
    }
}

fn normalize(namespace: &str, domain_or_url: &str) -> Result<String, FixerError> {
    if namespace.is_empty() {
        return Err(FixerError::validation("namespace must not be empty"));
    }
    let domain = extract_domain(domain_or_url);
    if domain.is_empty() {
        return Err(FixerError::validation(format!("'{domain_or_url}' is not a domain or URL")));
    }
    Ok(domain)
}
