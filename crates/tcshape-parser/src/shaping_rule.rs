//! Reassembles per-flow shaping rules from qdisc, class and filter rows.
//!
//! # Join
//!
//! For every filter of a device with a non-empty flow key:
//!
//! 1. qdisc rows whose `parent` equals the filter's `flowid` or `classid`
//!    contribute their `kind` and parameters;
//! 2. class rows whose `classid` equals the filter's `flowid` or `classid`
//!    contribute their `kind`, `parent` and parameters;
//! 3. the filter's `filter_id` is recorded.
//!
//! Later matches overwrite earlier ones field by field, class rows after
//! qdisc rows. A filter nothing matches contributes no rule.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tcshape_common::commands::{build_root_filter_cmd, run_device_show, run_tc_show};
use tcshape_common::{CommandRunner, ShellRunner, TcShapeResult};
use tcshape_types::{IpVersion, TcObjectKind, TrafficDirection};

use crate::class::ClassParser;
use crate::config::ParserConfig;
use crate::filter::FilterParser;
use crate::flow_key::FlowKeyResolver;
use crate::mangle::{IptablesMangleReader, MangleRule, MangleRuleSource};
use crate::params;
use crate::qdisc::QdiscParser;
use crate::record::{ClassRecord, FilterRecord, Params, QdiscRecord};
use crate::store::RecordStore;

/// Shaping parameters reached by one filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShapingRule {
    /// Filter the rule was reached through.
    pub filter_id: Option<String>,
    /// Merged qdisc/class parameters, verbatim.
    #[serde(flatten)]
    pub params: Params,
}

impl ShapingRule {
    /// Looks up a merged field by name (`filter_id` included).
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == params::FILTER_ID {
            return self.filter_id.as_deref();
        }
        self.params.get(key).map(String::as_str)
    }
}

/// Flow key to shaping rule, for one device and direction.
pub type ShapingRuleMapping = BTreeMap<String, ShapingRule>;

/// Shaping rules of one device in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceShaping {
    pub outgoing: ShapingRuleMapping,
    pub incoming: ShapingRuleMapping,
}

impl DeviceShaping {
    pub fn direction(&self, direction: TrafficDirection) -> &ShapingRuleMapping {
        match direction {
            TrafficDirection::Outgoing => &self.outgoing,
            TrafficDirection::Incoming => &self.incoming,
        }
    }
}

/// Device name to its shaping rules.
pub type TcParameters = BTreeMap<String, DeviceShaping>;

/// Parser bound to the live system: `/bin/sh` for `tc`, iptables for marks.
pub type SystemShapingRuleParser = ShapingRuleParser<ShellRunner, IptablesMangleReader<ShellRunner>>;

/// Reconstructs the active shaping configuration of one device.
///
/// Listings are read lazily, once per device, and kept until
/// [`clear`](Self::clear).
///
/// # Example
///
/// ```ignore
/// use tcshape_parser::{ParserConfig, ShapingRuleParser};
///
/// let mut parser = ShapingRuleParser::with_system_commands("eth0", ParserConfig::new())?;
/// let params = parser.get_tc_parameter()?;
/// ```
pub struct ShapingRuleParser<R, M> {
    device: String,
    ifb_device: Option<String>,
    config: ParserConfig,
    runner: R,
    mangle_source: M,
    filter_parser: FilterParser,
    key_resolver: FlowKeyResolver,
    store: RecordStore,
    parsed_devices: HashSet<String>,
    mangle_rules: Option<Vec<MangleRule>>,
}

impl SystemShapingRuleParser {
    /// Creates a parser that runs the real `tc` and iptables commands.
    pub fn with_system_commands(device: impl Into<String>, config: ParserConfig) -> TcShapeResult<Self> {
        let mangle_source = IptablesMangleReader::new(ShellRunner::new(), config.ip_version);
        Self::new(device, config, ShellRunner::new(), mangle_source)
    }
}

impl<R: CommandRunner, M: MangleRuleSource> ShapingRuleParser<R, M> {
    /// Creates a parser for `device` and discovers its mirror device.
    ///
    /// # Errors
    ///
    /// * [`TcShapeError::DeviceNotFound`](tcshape_common::TcShapeError::DeviceNotFound)
    ///   if the device does not exist
    /// * [`TcShapeError::ShellCommandFailed`](tcshape_common::TcShapeError::ShellCommandFailed)
    ///   if the root filter listing fails for another reason
    pub fn new(
        device: impl Into<String>,
        config: ParserConfig,
        runner: R,
        mangle_source: M,
    ) -> TcShapeResult<Self> {
        let device = device.into();
        let filter_parser = FilterParser::new(config.ip_version);

        let root_listing = run_device_show(&runner, &build_root_filter_cmd(&device), &device)?;
        let ifb_device = filter_parser.parse_incoming_device(&root_listing);
        match &ifb_device {
            Some(ifb) => tracing::info!(device = %device, ifb = %ifb, "Found incoming mirror device"),
            None => tracing::debug!(device = %device, "No incoming mirror device"),
        }

        Ok(Self {
            device,
            ifb_device,
            config,
            runner,
            mangle_source,
            filter_parser,
            key_resolver: FlowKeyResolver::new(config.ip_version),
            store: RecordStore::new(),
            parsed_devices: HashSet::new(),
            mangle_rules: None,
        })
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Mirror device receiving the redirected ingress traffic, if any.
    pub fn ifb_device(&self) -> Option<&str> {
        self.ifb_device.as_deref()
    }

    pub fn ip_version(&self) -> IpVersion {
        self.config.ip_version
    }

    /// Rows parsed so far.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Discards every parsed row, the parsed-device cache and the mangle rules.
    pub fn clear(&mut self) {
        self.store.clear();
        self.parsed_devices.clear();
        self.mangle_rules = None;
    }

    /// Reads the listings of the device and of its mirror.
    pub fn parse(&mut self) -> TcShapeResult<()> {
        let device = self.device.clone();
        self.parse_device(&device)?;

        if let Some(ifb) = self.ifb_device.clone() {
            self.parse_device(&ifb)?;
        }
        Ok(())
    }

    /// Returns `{device: {outgoing: ..., incoming: ...}}`.
    ///
    /// `incoming` is empty when the device has no mirror.
    pub fn get_tc_parameter(&mut self) -> TcShapeResult<TcParameters> {
        let device = self.device.clone();
        let outgoing = self.shaping_rules(&device)?;
        let incoming = match self.ifb_device.clone() {
            Some(ifb) => self.shaping_rules(&ifb)?,
            None => ShapingRuleMapping::new(),
        };

        let mut result = TcParameters::new();
        result.insert(device, DeviceShaping { outgoing, incoming });
        Ok(result)
    }

    /// Filter rows of the device itself.
    pub fn outgoing_filters(&mut self) -> TcShapeResult<Vec<FilterRecord>> {
        let device = self.device.clone();
        self.filters(&device)
    }

    /// Filter rows of the mirror device (empty without one).
    pub fn incoming_filters(&mut self) -> TcShapeResult<Vec<FilterRecord>> {
        match self.ifb_device.clone() {
            Some(ifb) => self.filters(&ifb),
            None => Ok(Vec::new()),
        }
    }

    fn filters(&mut self, device: &str) -> TcShapeResult<Vec<FilterRecord>> {
        self.parse_device(device)?;
        Ok(self.store.select_or_empty::<FilterRecord>(device).to_vec())
    }

    fn parse_device(&mut self, device: &str) -> TcShapeResult<()> {
        if self.parsed_devices.contains(device) {
            tracing::trace!(device = %device, "Device already parsed");
            return Ok(());
        }

        // All three listings are read before anything is stored, so a
        // failing command leaves no partial device behind.
        let class_listing = run_tc_show(&self.runner, TcObjectKind::Class, device)?;
        let filter_listing = run_tc_show(&self.runner, TcObjectKind::Filter, device)?;
        let qdisc_listing = run_tc_show(&self.runner, TcObjectKind::Qdisc, device)?;

        let classes = self.store.insert(ClassParser::new().parse(device, &class_listing));
        let filters = self.store.insert(self.filter_parser.parse(device, &filter_listing));
        let qdiscs = self.store.insert(QdiscParser::new().parse(device, &qdisc_listing));

        tracing::debug!(
            device = %device,
            classes = classes,
            filters = filters,
            qdiscs = qdiscs,
            "Parsed device"
        );
        self.parsed_devices.insert(device.to_string());
        Ok(())
    }

    fn shaping_rules(&mut self, device: &str) -> TcShapeResult<ShapingRuleMapping> {
        if device.is_empty() {
            return Ok(ShapingRuleMapping::new());
        }
        self.parse_device(device)?;

        let filters = self.store.select_or_empty::<FilterRecord>(device);
        if self.mangle_rules.is_none() && filters.iter().any(|f| f.handle.is_some()) {
            self.mangle_rules = Some(self.mangle_source.mangle_rules()?);
        }
        let mangle_rules = self.mangle_rules.as_deref().unwrap_or(&[]);
        let qdiscs = self.store.select_or_empty::<QdiscRecord>(device);
        let classes = self.store.select_or_empty::<ClassRecord>(device);

        let mut mapping = ShapingRuleMapping::new();
        for filter in filters {
            tracing::debug!(device = %device, filter = ?filter, "filter param");

            let key = self.key_resolver.flow_key(filter, mangle_rules)?;
            if key.is_empty() {
                tracing::debug!(device = %device, filter = ?filter, "empty filter key");
                continue;
            }

            match join_filter(filter, qdiscs, classes) {
                Some(rule) => {
                    tracing::debug!(device = %device, key = %key, rule = ?rule, "shaping rule found");
                    mapping.insert(key, rule);
                }
                None => {
                    tracing::debug!(device = %device, filter = ?filter, "shaping rule not found");
                }
            }
        }

        Ok(mapping)
    }
}

fn join_filter(
    filter: &FilterRecord,
    qdiscs: &[QdiscRecord],
    classes: &[ClassRecord],
) -> Option<ShapingRule> {
    let mut rule = ShapingRule::default();
    let mut matched = false;

    for qdisc in qdiscs.iter().filter(|q| filter.targets(q.parent.as_deref())) {
        tracing::trace!(qdisc = ?qdisc, "qdisc matched");
        rule.params.insert(params::KIND.to_string(), qdisc.kind.clone());
        rule.params.extend(qdisc.params.clone());
        matched = true;
    }

    for class in classes.iter().filter(|c| filter.targets(Some(&c.class_id))) {
        tracing::trace!(class = ?class, "class matched");
        rule.params.insert(params::KIND.to_string(), class.kind.clone());
        if let Some(parent) = &class.parent {
            rule.params.insert(params::PARENT.to_string(), parent.clone());
        }
        rule.params.extend(class.params.clone());
        matched = true;
    }

    matched.then(|| ShapingRule {
        filter_id: filter.filter_id.clone(),
        ..rule
    })
}
