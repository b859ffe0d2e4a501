//! FlatBuffers tables exchanged with the engine.
//!
//! Mirrors `schema/messaging.fbs`. Slot offsets (`VT_*`) follow the field
//! order of the schema and are part of the ABI: reordering them breaks
//! every engine build that reads or writes the table.
//!
//! Tables are views over a verified buffer; obtain one through
//! [`flatbuffers::root`]. Each table has an `*Args` struct and a `create`
//! function for the writing side.

use flatbuffers::{
    FlatBufferBuilder, Follow, ForwardsUOffset, InvalidFlatbuffer, Table, VOffsetT, Vector,
    Verifiable, Verifier, WIPOffset,
};

/// A vector of tables.
pub type TableVector<'a, T> = Vector<'a, ForwardsUOffset<T>>;

macro_rules! table {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq)]
        pub struct $name<'a> {
            pub _tab: Table<'a>,
        }

        impl<'a> Follow<'a> for $name<'a> {
            type Inner = $name<'a>;

            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                Self {
                    _tab: Table::new(buf, loc),
                }
            }
        }
    };
}

#[inline]
fn field<'a, T: Follow<'a> + 'a>(tab: &Table<'a>, slot: VOffsetT) -> Option<T::Inner> {
    // SAFETY: tables are reached through `flatbuffers::root`, which checked
    // each slot against the type read here.
    unsafe { tab.get::<T>(slot, None) }
}

#[inline]
fn string<'a>(tab: &Table<'a>, slot: VOffsetT) -> Option<&'a str> {
    field::<ForwardsUOffset<&str>>(tab, slot)
}

#[inline]
fn flag(tab: &Table<'_>, slot: VOffsetT) -> bool {
    field::<bool>(tab, slot).unwrap_or(false)
}

#[inline]
fn tables<'a, T: Follow<'a> + 'a>(tab: &Table<'a>, slot: VOffsetT) -> Option<TableVector<'a, T>> {
    field::<ForwardsUOffset<TableVector<'a, T>>>(tab, slot)
}

// ---- shared -------------------------------------------------------------

table!(PropertyEntry);

impl<'a> PropertyEntry<'a> {
    pub const VT_KEY: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;

    pub fn key(&self) -> &'a str {
        string(&self._tab, Self::VT_KEY).unwrap_or_default()
    }

    pub fn value(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_VALUE)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &PropertyEntryArgs<'b>,
    ) -> WIPOffset<PropertyEntry<'b>> {
        let start = fbb.start_table();
        fbb.push_slot_always::<WIPOffset<_>>(Self::VT_KEY, args.key);
        if let Some(value) = args.value {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_VALUE, value);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

pub struct PropertyEntryArgs<'a> {
    pub key: WIPOffset<&'a str>,
    pub value: Option<WIPOffset<&'a str>>,
}

impl Verifiable for PropertyEntry<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("key", Self::VT_KEY, true)?
            .visit_field::<ForwardsUOffset<&str>>("value", Self::VT_VALUE, false)?
            .finish();
        Ok(())
    }
}

table!(CustomStrategyResult);

impl<'a> CustomStrategyResult<'a> {
    pub const VT_KEY: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;

    pub fn key(&self) -> &'a str {
        string(&self._tab, Self::VT_KEY).unwrap_or_default()
    }

    pub fn value(&self) -> bool {
        flag(&self._tab, Self::VT_VALUE)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &CustomStrategyResultArgs<'b>,
    ) -> WIPOffset<CustomStrategyResult<'b>> {
        let start = fbb.start_table();
        fbb.push_slot_always::<WIPOffset<_>>(Self::VT_KEY, args.key);
        fbb.push_slot::<bool>(Self::VT_VALUE, args.value, false);
        WIPOffset::new(fbb.end_table(start).value())
    }
}

pub struct CustomStrategyResultArgs<'a> {
    pub key: WIPOffset<&'a str>,
    pub value: bool,
}

impl Verifiable for CustomStrategyResult<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("key", Self::VT_KEY, true)?
            .visit_field::<bool>("value", Self::VT_VALUE, false)?
            .finish();
        Ok(())
    }
}

table!(
    /// One metric label.
    MetricLabel
);

impl<'a> MetricLabel<'a> {
    pub const VT_KEY: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;

    pub fn key(&self) -> &'a str {
        string(&self._tab, Self::VT_KEY).unwrap_or_default()
    }

    pub fn value(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_VALUE)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &MetricLabelArgs<'b>,
    ) -> WIPOffset<MetricLabel<'b>> {
        let start = fbb.start_table();
        fbb.push_slot_always::<WIPOffset<_>>(Self::VT_KEY, args.key);
        if let Some(value) = args.value {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_VALUE, value);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

pub struct MetricLabelArgs<'a> {
    pub key: WIPOffset<&'a str>,
    pub value: Option<WIPOffset<&'a str>>,
}

impl Verifiable for MetricLabel<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("key", Self::VT_KEY, true)?
            .visit_field::<ForwardsUOffset<&str>>("value", Self::VT_VALUE, false)?
            .finish();
        Ok(())
    }
}

// ---- requests -----------------------------------------------------------

table!(
    /// Evaluation request for one toggle.
    ContextMessage
);

impl<'a> ContextMessage<'a> {
    pub const VT_TOGGLE_NAME: VOffsetT = 4;
    pub const VT_APP_NAME: VOffsetT = 6;
    pub const VT_CURRENT_TIME: VOffsetT = 8;
    pub const VT_ENVIRONMENT: VOffsetT = 10;
    pub const VT_CUSTOM_STRATEGIES_RESULTS: VOffsetT = 12;
    pub const VT_REMOTE_ADDRESS: VOffsetT = 14;
    pub const VT_SESSION_ID: VOffsetT = 16;
    pub const VT_USER_ID: VOffsetT = 18;
    pub const VT_PROPERTIES: VOffsetT = 20;
    pub const VT_RUNTIME_HOSTNAME: VOffsetT = 22;

    pub fn toggle_name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_TOGGLE_NAME)
    }

    pub fn app_name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_APP_NAME)
    }

    pub fn current_time(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_CURRENT_TIME)
    }

    pub fn environment(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_ENVIRONMENT)
    }

    pub fn custom_strategies_results(
        &self,
    ) -> Option<TableVector<'a, CustomStrategyResult<'a>>> {
        tables(&self._tab, Self::VT_CUSTOM_STRATEGIES_RESULTS)
    }

    pub fn remote_address(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_REMOTE_ADDRESS)
    }

    pub fn session_id(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_SESSION_ID)
    }

    pub fn user_id(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_USER_ID)
    }

    pub fn properties(&self) -> Option<TableVector<'a, PropertyEntry<'a>>> {
        tables(&self._tab, Self::VT_PROPERTIES)
    }

    pub fn runtime_hostname(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_RUNTIME_HOSTNAME)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &ContextMessageArgs<'b>,
    ) -> WIPOffset<ContextMessage<'b>> {
        let start = fbb.start_table();
        let push_string =
            |fbb: &mut FlatBufferBuilder<'b>, slot: VOffsetT, value: Option<WIPOffset<&'b str>>| {
                if let Some(value) = value {
                    fbb.push_slot_always::<WIPOffset<_>>(slot, value);
                }
            };
        push_string(fbb, Self::VT_TOGGLE_NAME, args.toggle_name);
        push_string(fbb, Self::VT_APP_NAME, args.app_name);
        push_string(fbb, Self::VT_CURRENT_TIME, args.current_time);
        push_string(fbb, Self::VT_ENVIRONMENT, args.environment);
        if let Some(results) = args.custom_strategies_results {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_CUSTOM_STRATEGIES_RESULTS, results);
        }
        push_string(fbb, Self::VT_REMOTE_ADDRESS, args.remote_address);
        push_string(fbb, Self::VT_SESSION_ID, args.session_id);
        push_string(fbb, Self::VT_USER_ID, args.user_id);
        if let Some(properties) = args.properties {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_PROPERTIES, properties);
        }
        push_string(fbb, Self::VT_RUNTIME_HOSTNAME, args.runtime_hostname);
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct ContextMessageArgs<'a> {
    pub toggle_name: Option<WIPOffset<&'a str>>,
    pub app_name: Option<WIPOffset<&'a str>>,
    pub current_time: Option<WIPOffset<&'a str>>,
    pub environment: Option<WIPOffset<&'a str>>,
    pub custom_strategies_results:
        Option<WIPOffset<TableVector<'a, CustomStrategyResult<'a>>>>,
    pub remote_address: Option<WIPOffset<&'a str>>,
    pub session_id: Option<WIPOffset<&'a str>>,
    pub user_id: Option<WIPOffset<&'a str>>,
    pub properties: Option<WIPOffset<TableVector<'a, PropertyEntry<'a>>>>,
    pub runtime_hostname: Option<WIPOffset<&'a str>>,
}

impl Verifiable for ContextMessage<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("toggle_name", Self::VT_TOGGLE_NAME, false)?
            .visit_field::<ForwardsUOffset<&str>>("app_name", Self::VT_APP_NAME, false)?
            .visit_field::<ForwardsUOffset<&str>>("current_time", Self::VT_CURRENT_TIME, false)?
            .visit_field::<ForwardsUOffset<&str>>("environment", Self::VT_ENVIRONMENT, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<CustomStrategyResult>>>>(
                "custom_strategies_results",
                Self::VT_CUSTOM_STRATEGIES_RESULTS,
                false,
            )?
            .visit_field::<ForwardsUOffset<&str>>("remote_address", Self::VT_REMOTE_ADDRESS, false)?
            .visit_field::<ForwardsUOffset<&str>>("session_id", Self::VT_SESSION_ID, false)?
            .visit_field::<ForwardsUOffset<&str>>("user_id", Self::VT_USER_ID, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<PropertyEntry>>>>(
                "properties",
                Self::VT_PROPERTIES,
                false,
            )?
            .visit_field::<ForwardsUOffset<&str>>(
                "runtime_hostname",
                Self::VT_RUNTIME_HOSTNAME,
                false,
            )?
            .finish();
        Ok(())
    }
}

table!(DefineCounter);

impl<'a> DefineCounter<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_HELP: VOffsetT = 6;

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn help(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_HELP)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &DefineMetricArgs<'b>,
    ) -> WIPOffset<DefineCounter<'b>> {
        WIPOffset::new(define_metric(fbb, args).value())
    }
}

impl Verifiable for DefineCounter<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        verify_define(v, pos)
    }
}

table!(DefineGauge);

impl<'a> DefineGauge<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_HELP: VOffsetT = 6;

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn help(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_HELP)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &DefineMetricArgs<'b>,
    ) -> WIPOffset<DefineGauge<'b>> {
        WIPOffset::new(define_metric(fbb, args).value())
    }
}

impl Verifiable for DefineGauge<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        verify_define(v, pos)
    }
}

/// Arguments shared by `DefineCounter` and `DefineGauge`, which have the
/// same layout.
#[derive(Default)]
pub struct DefineMetricArgs<'a> {
    pub name: Option<WIPOffset<&'a str>>,
    pub help: Option<WIPOffset<&'a str>>,
}

fn define_metric(
    fbb: &mut FlatBufferBuilder<'_>,
    args: &DefineMetricArgs<'_>,
) -> WIPOffset<flatbuffers::TableFinishedWIPOffset> {
    let start = fbb.start_table();
    if let Some(name) = args.name {
        fbb.push_slot_always::<WIPOffset<_>>(DefineCounter::VT_NAME, name);
    }
    if let Some(help) = args.help {
        fbb.push_slot_always::<WIPOffset<_>>(DefineCounter::VT_HELP, help);
    }
    fbb.end_table(start)
}

fn verify_define(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
    v.visit_table(pos)?
        .visit_field::<ForwardsUOffset<&str>>("name", DefineCounter::VT_NAME, false)?
        .visit_field::<ForwardsUOffset<&str>>("help", DefineCounter::VT_HELP, false)?
        .finish();
    Ok(())
}

table!(IncCounter);

impl<'a> IncCounter<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;
    pub const VT_LABELS: VOffsetT = 8;

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn value(&self) -> i64 {
        field::<i64>(&self._tab, Self::VT_VALUE).unwrap_or(0)
    }

    pub fn labels(&self) -> Option<TableVector<'a, MetricLabel<'a>>> {
        tables(&self._tab, Self::VT_LABELS)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &IncCounterArgs<'b>,
    ) -> WIPOffset<IncCounter<'b>> {
        let start = fbb.start_table();
        fbb.push_slot::<i64>(Self::VT_VALUE, args.value, 0);
        if let Some(name) = args.name {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_NAME, name);
        }
        if let Some(labels) = args.labels {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_LABELS, labels);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct IncCounterArgs<'a> {
    pub name: Option<WIPOffset<&'a str>>,
    pub value: i64,
    pub labels: Option<WIPOffset<TableVector<'a, MetricLabel<'a>>>>,
}

impl Verifiable for IncCounter<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .visit_field::<i64>("value", Self::VT_VALUE, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<MetricLabel>>>>(
                "labels",
                Self::VT_LABELS,
                false,
            )?
            .finish();
        Ok(())
    }
}

table!(SetGauge);

impl<'a> SetGauge<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;
    pub const VT_LABELS: VOffsetT = 8;

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn value(&self) -> f64 {
        field::<f64>(&self._tab, Self::VT_VALUE).unwrap_or(0.0)
    }

    pub fn labels(&self) -> Option<TableVector<'a, MetricLabel<'a>>> {
        tables(&self._tab, Self::VT_LABELS)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &SampleArgs<'b>,
    ) -> WIPOffset<SetGauge<'b>> {
        WIPOffset::new(sample(fbb, args).value())
    }
}

impl Verifiable for SetGauge<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        verify_sample(v, pos)
    }
}

table!(ObserveHistogram);

impl<'a> ObserveHistogram<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;
    pub const VT_LABELS: VOffsetT = 8;

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn value(&self) -> f64 {
        field::<f64>(&self._tab, Self::VT_VALUE).unwrap_or(0.0)
    }

    pub fn labels(&self) -> Option<TableVector<'a, MetricLabel<'a>>> {
        tables(&self._tab, Self::VT_LABELS)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &SampleArgs<'b>,
    ) -> WIPOffset<ObserveHistogram<'b>> {
        WIPOffset::new(sample(fbb, args).value())
    }
}

impl Verifiable for ObserveHistogram<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        verify_sample(v, pos)
    }
}

/// Arguments shared by `SetGauge` and `ObserveHistogram`.
#[derive(Default)]
pub struct SampleArgs<'a> {
    pub name: Option<WIPOffset<&'a str>>,
    pub value: f64,
    pub labels: Option<WIPOffset<TableVector<'a, MetricLabel<'a>>>>,
}

fn sample(
    fbb: &mut FlatBufferBuilder<'_>,
    args: &SampleArgs<'_>,
) -> WIPOffset<flatbuffers::TableFinishedWIPOffset> {
    let start = fbb.start_table();
    fbb.push_slot::<f64>(SetGauge::VT_VALUE, args.value, 0.0);
    if let Some(name) = args.name {
        fbb.push_slot_always::<WIPOffset<_>>(SetGauge::VT_NAME, name);
    }
    if let Some(labels) = args.labels {
        fbb.push_slot_always::<WIPOffset<_>>(SetGauge::VT_LABELS, labels);
    }
    fbb.end_table(start)
}

fn verify_sample(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
    v.visit_table(pos)?
        .visit_field::<ForwardsUOffset<&str>>("name", SetGauge::VT_NAME, false)?
        .visit_field::<f64>("value", SetGauge::VT_VALUE, false)?
        .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<MetricLabel>>>>(
            "labels",
            SetGauge::VT_LABELS,
            false,
        )?
        .finish();
    Ok(())
}

table!(DefineHistogram);

impl<'a> DefineHistogram<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_HELP: VOffsetT = 6;
    pub const VT_BUCKETS: VOffsetT = 8;

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn help(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_HELP)
    }

    pub fn buckets(&self) -> Option<Vector<'a, f64>> {
        field::<ForwardsUOffset<Vector<'a, f64>>>(&self._tab, Self::VT_BUCKETS)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &DefineHistogramArgs<'b>,
    ) -> WIPOffset<DefineHistogram<'b>> {
        let start = fbb.start_table();
        if let Some(name) = args.name {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_NAME, name);
        }
        if let Some(help) = args.help {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_HELP, help);
        }
        if let Some(buckets) = args.buckets {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_BUCKETS, buckets);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct DefineHistogramArgs<'a> {
    pub name: Option<WIPOffset<&'a str>>,
    pub help: Option<WIPOffset<&'a str>>,
    pub buckets: Option<WIPOffset<Vector<'a, f64>>>,
}

impl Verifiable for DefineHistogram<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .visit_field::<ForwardsUOffset<&str>>("help", Self::VT_HELP, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, f64>>>("buckets", Self::VT_BUCKETS, false)?
            .finish();
        Ok(())
    }
}

// ---- responses ----------------------------------------------------------

table!(
    /// Result of `flat_check_enabled`. `enabled` only means something when
    /// `has_enabled` is set.
    Response
);

impl<'a> Response<'a> {
    pub const VT_IMPRESSION_DATA: VOffsetT = 4;
    pub const VT_ENABLED: VOffsetT = 6;
    pub const VT_HAS_ENABLED: VOffsetT = 8;
    pub const VT_ERROR: VOffsetT = 10;

    pub fn impression_data(&self) -> bool {
        flag(&self._tab, Self::VT_IMPRESSION_DATA)
    }

    pub fn enabled(&self) -> bool {
        flag(&self._tab, Self::VT_ENABLED)
    }

    pub fn has_enabled(&self) -> bool {
        flag(&self._tab, Self::VT_HAS_ENABLED)
    }

    pub fn error(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_ERROR)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &ResponseArgs<'b>,
    ) -> WIPOffset<Response<'b>> {
        let start = fbb.start_table();
        if let Some(error) = args.error {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_ERROR, error);
        }
        fbb.push_slot::<bool>(Self::VT_IMPRESSION_DATA, args.impression_data, false);
        fbb.push_slot::<bool>(Self::VT_ENABLED, args.enabled, false);
        fbb.push_slot::<bool>(Self::VT_HAS_ENABLED, args.has_enabled, false);
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct ResponseArgs<'a> {
    pub impression_data: bool,
    pub enabled: bool,
    pub has_enabled: bool,
    pub error: Option<WIPOffset<&'a str>>,
}

impl Verifiable for Response<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<bool>("impression_data", Self::VT_IMPRESSION_DATA, false)?
            .visit_field::<bool>("enabled", Self::VT_ENABLED, false)?
            .visit_field::<bool>("has_enabled", Self::VT_HAS_ENABLED, false)?
            .visit_field::<ForwardsUOffset<&str>>("error", Self::VT_ERROR, false)?
            .finish();
        Ok(())
    }
}

table!(VariantPayload);

impl<'a> VariantPayload<'a> {
    pub const VT_PAYLOAD_TYPE: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;

    pub fn payload_type(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_PAYLOAD_TYPE)
    }

    pub fn value(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_VALUE)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &VariantPayloadArgs<'b>,
    ) -> WIPOffset<VariantPayload<'b>> {
        let start = fbb.start_table();
        if let Some(payload_type) = args.payload_type {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_PAYLOAD_TYPE, payload_type);
        }
        if let Some(value) = args.value {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_VALUE, value);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct VariantPayloadArgs<'a> {
    pub payload_type: Option<WIPOffset<&'a str>>,
    pub value: Option<WIPOffset<&'a str>>,
}

impl Verifiable for VariantPayload<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("payload_type", Self::VT_PAYLOAD_TYPE, false)?
            .visit_field::<ForwardsUOffset<&str>>("value", Self::VT_VALUE, false)?
            .finish();
        Ok(())
    }
}

table!(
    /// Result of `flat_check_variant`. A table without a name means the
    /// toggle was not found.
    Variant
);

impl<'a> Variant<'a> {
    pub const VT_FEATURE_ENABLED: VOffsetT = 4;
    pub const VT_IMPRESSION_DATA: VOffsetT = 6;
    pub const VT_ENABLED: VOffsetT = 8;
    pub const VT_NAME: VOffsetT = 10;
    pub const VT_PAYLOAD: VOffsetT = 12;
    pub const VT_ERROR: VOffsetT = 14;

    pub fn feature_enabled(&self) -> bool {
        flag(&self._tab, Self::VT_FEATURE_ENABLED)
    }

    pub fn impression_data(&self) -> bool {
        flag(&self._tab, Self::VT_IMPRESSION_DATA)
    }

    pub fn enabled(&self) -> bool {
        flag(&self._tab, Self::VT_ENABLED)
    }

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn payload(&self) -> Option<VariantPayload<'a>> {
        field::<ForwardsUOffset<VariantPayload>>(&self._tab, Self::VT_PAYLOAD)
    }

    pub fn error(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_ERROR)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &VariantArgs<'b>,
    ) -> WIPOffset<Variant<'b>> {
        let start = fbb.start_table();
        if let Some(name) = args.name {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_NAME, name);
        }
        if let Some(payload) = args.payload {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_PAYLOAD, payload);
        }
        if let Some(error) = args.error {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_ERROR, error);
        }
        fbb.push_slot::<bool>(Self::VT_FEATURE_ENABLED, args.feature_enabled, false);
        fbb.push_slot::<bool>(Self::VT_IMPRESSION_DATA, args.impression_data, false);
        fbb.push_slot::<bool>(Self::VT_ENABLED, args.enabled, false);
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct VariantArgs<'a> {
    pub feature_enabled: bool,
    pub impression_data: bool,
    pub enabled: bool,
    pub name: Option<WIPOffset<&'a str>>,
    pub payload: Option<WIPOffset<VariantPayload<'a>>>,
    pub error: Option<WIPOffset<&'a str>>,
}

impl Verifiable for Variant<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<bool>("feature_enabled", Self::VT_FEATURE_ENABLED, false)?
            .visit_field::<bool>("impression_data", Self::VT_IMPRESSION_DATA, false)?
            .visit_field::<bool>("enabled", Self::VT_ENABLED, false)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .visit_field::<ForwardsUOffset<VariantPayload>>("payload", Self::VT_PAYLOAD, false)?
            .visit_field::<ForwardsUOffset<&str>>("error", Self::VT_ERROR, false)?
            .finish();
        Ok(())
    }
}

table!(VariantEntry);

impl<'a> VariantEntry<'a> {
    pub const VT_KEY: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;

    pub fn key(&self) -> &'a str {
        string(&self._tab, Self::VT_KEY).unwrap_or_default()
    }

    pub fn value(&self) -> u32 {
        field::<u32>(&self._tab, Self::VT_VALUE).unwrap_or(0)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &VariantEntryArgs<'b>,
    ) -> WIPOffset<VariantEntry<'b>> {
        let start = fbb.start_table();
        fbb.push_slot_always::<WIPOffset<_>>(Self::VT_KEY, args.key);
        fbb.push_slot::<u32>(Self::VT_VALUE, args.value, 0);
        WIPOffset::new(fbb.end_table(start).value())
    }
}

pub struct VariantEntryArgs<'a> {
    pub key: WIPOffset<&'a str>,
    pub value: u32,
}

impl Verifiable for VariantEntry<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("key", Self::VT_KEY, true)?
            .visit_field::<u32>("value", Self::VT_VALUE, false)?
            .finish();
        Ok(())
    }
}

table!(ToggleStats);

impl<'a> ToggleStats<'a> {
    pub const VT_YES: VOffsetT = 4;
    pub const VT_NO: VOffsetT = 6;
    pub const VT_VARIANTS: VOffsetT = 8;

    pub fn yes(&self) -> u32 {
        field::<u32>(&self._tab, Self::VT_YES).unwrap_or(0)
    }

    pub fn no(&self) -> u32 {
        field::<u32>(&self._tab, Self::VT_NO).unwrap_or(0)
    }

    pub fn variants(&self) -> Option<TableVector<'a, VariantEntry<'a>>> {
        tables(&self._tab, Self::VT_VARIANTS)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &ToggleStatsArgs<'b>,
    ) -> WIPOffset<ToggleStats<'b>> {
        let start = fbb.start_table();
        if let Some(variants) = args.variants {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_VARIANTS, variants);
        }
        fbb.push_slot::<u32>(Self::VT_YES, args.yes, 0);
        fbb.push_slot::<u32>(Self::VT_NO, args.no, 0);
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct ToggleStatsArgs<'a> {
    pub yes: u32,
    pub no: u32,
    pub variants: Option<WIPOffset<TableVector<'a, VariantEntry<'a>>>>,
}

impl Verifiable for ToggleStats<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<u32>("yes", Self::VT_YES, false)?
            .visit_field::<u32>("no", Self::VT_NO, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<VariantEntry>>>>(
                "variants",
                Self::VT_VARIANTS,
                false,
            )?
            .finish();
        Ok(())
    }
}

table!(ToggleEntry);

impl<'a> ToggleEntry<'a> {
    pub const VT_KEY: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;

    pub fn key(&self) -> &'a str {
        string(&self._tab, Self::VT_KEY).unwrap_or_default()
    }

    pub fn value(&self) -> Option<ToggleStats<'a>> {
        field::<ForwardsUOffset<ToggleStats>>(&self._tab, Self::VT_VALUE)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &ToggleEntryArgs<'b>,
    ) -> WIPOffset<ToggleEntry<'b>> {
        let start = fbb.start_table();
        fbb.push_slot_always::<WIPOffset<_>>(Self::VT_KEY, args.key);
        if let Some(value) = args.value {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_VALUE, value);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

pub struct ToggleEntryArgs<'a> {
    pub key: WIPOffset<&'a str>,
    pub value: Option<WIPOffset<ToggleStats<'a>>>,
}

impl Verifiable for ToggleEntry<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("key", Self::VT_KEY, true)?
            .visit_field::<ForwardsUOffset<ToggleStats>>("value", Self::VT_VALUE, false)?
            .finish();
        Ok(())
    }
}

table!(
    /// Usage counts since the previous read. No toggles means nothing was
    /// counted.
    MetricsResponse
);

impl<'a> MetricsResponse<'a> {
    pub const VT_START: VOffsetT = 4;
    pub const VT_STOP: VOffsetT = 6;
    pub const VT_TOGGLES: VOffsetT = 8;

    /// Window start in milliseconds since the Unix epoch.
    pub fn start(&self) -> i64 {
        field::<i64>(&self._tab, Self::VT_START).unwrap_or(0)
    }

    pub fn stop(&self) -> i64 {
        field::<i64>(&self._tab, Self::VT_STOP).unwrap_or(0)
    }

    pub fn toggles(&self) -> Option<TableVector<'a, ToggleEntry<'a>>> {
        tables(&self._tab, Self::VT_TOGGLES)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &MetricsResponseArgs<'b>,
    ) -> WIPOffset<MetricsResponse<'b>> {
        let start = fbb.start_table();
        fbb.push_slot::<i64>(Self::VT_START, args.start, 0);
        fbb.push_slot::<i64>(Self::VT_STOP, args.stop, 0);
        if let Some(toggles) = args.toggles {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_TOGGLES, toggles);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct MetricsResponseArgs<'a> {
    pub start: i64,
    pub stop: i64,
    pub toggles: Option<WIPOffset<TableVector<'a, ToggleEntry<'a>>>>,
}

impl Verifiable for MetricsResponse<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i64>("start", Self::VT_START, false)?
            .visit_field::<i64>("stop", Self::VT_STOP, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<ToggleEntry>>>>(
                "toggles",
                Self::VT_TOGGLES,
                false,
            )?
            .finish();
        Ok(())
    }
}

table!(StrategyParameter);

impl<'a> StrategyParameter<'a> {
    pub const VT_KEY: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;

    pub fn key(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_KEY)
    }

    pub fn value(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_VALUE)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &StrategyParameterArgs<'b>,
    ) -> WIPOffset<StrategyParameter<'b>> {
        let start = fbb.start_table();
        if let Some(key) = args.key {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_KEY, key);
        }
        if let Some(value) = args.value {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_VALUE, value);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct StrategyParameterArgs<'a> {
    pub key: Option<WIPOffset<&'a str>>,
    pub value: Option<WIPOffset<&'a str>>,
}

impl Verifiable for StrategyParameter<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("key", Self::VT_KEY, false)?
            .visit_field::<ForwardsUOffset<&str>>("value", Self::VT_VALUE, false)?
            .finish();
        Ok(())
    }
}

table!(StrategyDefinition);

impl<'a> StrategyDefinition<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_PARAMETERS: VOffsetT = 6;

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn parameters(&self) -> Option<TableVector<'a, StrategyParameter<'a>>> {
        tables(&self._tab, Self::VT_PARAMETERS)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &StrategyDefinitionArgs<'b>,
    ) -> WIPOffset<StrategyDefinition<'b>> {
        let start = fbb.start_table();
        if let Some(name) = args.name {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_NAME, name);
        }
        if let Some(parameters) = args.parameters {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_PARAMETERS, parameters);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct StrategyDefinitionArgs<'a> {
    pub name: Option<WIPOffset<&'a str>>,
    pub parameters: Option<WIPOffset<TableVector<'a, StrategyParameter<'a>>>>,
}

impl Verifiable for StrategyDefinition<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<StrategyParameter>>>>(
                "parameters",
                Self::VT_PARAMETERS,
                false,
            )?
            .finish();
        Ok(())
    }
}

table!(StrategyFeature);

impl<'a> StrategyFeature<'a> {
    pub const VT_FEATURE_NAME: VOffsetT = 4;
    pub const VT_STRATEGIES: VOffsetT = 6;

    pub fn feature_name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_FEATURE_NAME)
    }

    pub fn strategies(&self) -> Option<TableVector<'a, StrategyDefinition<'a>>> {
        tables(&self._tab, Self::VT_STRATEGIES)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &StrategyFeatureArgs<'b>,
    ) -> WIPOffset<StrategyFeature<'b>> {
        let start = fbb.start_table();
        if let Some(feature_name) = args.feature_name {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_FEATURE_NAME, feature_name);
        }
        if let Some(strategies) = args.strategies {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_STRATEGIES, strategies);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct StrategyFeatureArgs<'a> {
    pub feature_name: Option<WIPOffset<&'a str>>,
    pub strategies: Option<WIPOffset<TableVector<'a, StrategyDefinition<'a>>>>,
}

impl Verifiable for StrategyFeature<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("feature_name", Self::VT_FEATURE_NAME, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<StrategyDefinition>>>>(
                "strategies",
                Self::VT_STRATEGIES,
                false,
            )?
            .finish();
        Ok(())
    }
}

table!(
    /// Result of `flat_take_state`: every feature with its strategies, in
    /// the order the engine stores them.
    TakeStateResponse
);

impl<'a> TakeStateResponse<'a> {
    pub const VT_FEATURES: VOffsetT = 4;
    pub const VT_WARNINGS: VOffsetT = 6;
    pub const VT_ERROR: VOffsetT = 8;

    pub fn features(&self) -> Option<TableVector<'a, StrategyFeature<'a>>> {
        tables(&self._tab, Self::VT_FEATURES)
    }

    pub fn warnings(&self) -> Option<TableVector<'a, &'a str>> {
        tables(&self._tab, Self::VT_WARNINGS)
    }

    pub fn error(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_ERROR)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &TakeStateResponseArgs<'b>,
    ) -> WIPOffset<TakeStateResponse<'b>> {
        let start = fbb.start_table();
        if let Some(features) = args.features {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_FEATURES, features);
        }
        if let Some(warnings) = args.warnings {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_WARNINGS, warnings);
        }
        if let Some(error) = args.error {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_ERROR, error);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct TakeStateResponseArgs<'a> {
    pub features: Option<WIPOffset<TableVector<'a, StrategyFeature<'a>>>>,
    pub warnings: Option<WIPOffset<TableVector<'a, &'a str>>>,
    pub error: Option<WIPOffset<&'a str>>,
}

impl Verifiable for TakeStateResponse<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<StrategyFeature>>>>(
                "features",
                Self::VT_FEATURES,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<&str>>>>(
                "warnings",
                Self::VT_WARNINGS,
                false,
            )?
            .visit_field::<ForwardsUOffset<&str>>("error", Self::VT_ERROR, false)?
            .finish();
        Ok(())
    }
}

table!(FeatureDef);

impl<'a> FeatureDef<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_PROJECT: VOffsetT = 6;
    pub const VT_ENABLED: VOffsetT = 8;
    pub const VT_TYPE_: VOffsetT = 10;

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn project(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_PROJECT)
    }

    pub fn enabled(&self) -> bool {
        flag(&self._tab, Self::VT_ENABLED)
    }

    pub fn type_(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_TYPE_)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &FeatureDefArgs<'b>,
    ) -> WIPOffset<FeatureDef<'b>> {
        let start = fbb.start_table();
        if let Some(name) = args.name {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_NAME, name);
        }
        if let Some(project) = args.project {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_PROJECT, project);
        }
        if let Some(type_) = args.type_ {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_TYPE_, type_);
        }
        fbb.push_slot::<bool>(Self::VT_ENABLED, args.enabled, false);
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct FeatureDefArgs<'a> {
    pub name: Option<WIPOffset<&'a str>>,
    pub project: Option<WIPOffset<&'a str>>,
    pub enabled: bool,
    pub type_: Option<WIPOffset<&'a str>>,
}

impl Verifiable for FeatureDef<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .visit_field::<ForwardsUOffset<&str>>("project", Self::VT_PROJECT, false)?
            .visit_field::<bool>("enabled", Self::VT_ENABLED, false)?
            .visit_field::<ForwardsUOffset<&str>>("type_", Self::VT_TYPE_, false)?
            .finish();
        Ok(())
    }
}

table!(FeatureDefs);

impl<'a> FeatureDefs<'a> {
    pub const VT_ITEMS: VOffsetT = 4;

    pub fn items(&self) -> Option<TableVector<'a, FeatureDef<'a>>> {
        tables(&self._tab, Self::VT_ITEMS)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &FeatureDefsArgs<'b>,
    ) -> WIPOffset<FeatureDefs<'b>> {
        let start = fbb.start_table();
        if let Some(items) = args.items {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_ITEMS, items);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct FeatureDefsArgs<'a> {
    pub items: Option<WIPOffset<TableVector<'a, FeatureDef<'a>>>>,
}

impl Verifiable for FeatureDefs<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<FeatureDef>>>>(
                "items",
                Self::VT_ITEMS,
                false,
            )?
            .finish();
        Ok(())
    }
}

table!(BuiltInStrategies);

impl<'a> BuiltInStrategies<'a> {
    pub const VT_VALUES: VOffsetT = 4;

    pub fn values(&self) -> Option<TableVector<'a, &'a str>> {
        tables(&self._tab, Self::VT_VALUES)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &BuiltInStrategiesArgs<'b>,
    ) -> WIPOffset<BuiltInStrategies<'b>> {
        let start = fbb.start_table();
        if let Some(values) = args.values {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_VALUES, values);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct BuiltInStrategiesArgs<'a> {
    pub values: Option<WIPOffset<TableVector<'a, &'a str>>>,
}

impl Verifiable for BuiltInStrategies<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<&str>>>>(
                "values",
                Self::VT_VALUES,
                false,
            )?
            .finish();
        Ok(())
    }
}

table!(
    /// Result of the metric calls. Carries nothing but a possible error.
    VoidResponse
);

impl<'a> VoidResponse<'a> {
    pub const VT_ERROR: VOffsetT = 4;

    pub fn error(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_ERROR)
    }

    pub fn create<'b>(
        fbb: &mut FlatBufferBuilder<'b>,
        args: &VoidResponseArgs<'b>,
    ) -> WIPOffset<VoidResponse<'b>> {
        let start = fbb.start_table();
        if let Some(error) = args.error {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_ERROR, error);
        }
        WIPOffset::new(fbb.end_table(start).value())
    }
}

#[derive(Default)]
pub struct VoidResponseArgs<'a> {
    pub error: Option<WIPOffset<&'a str>>,
}

impl Verifiable for VoidResponse<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("error", Self::VT_ERROR, false)?
            .finish();
        Ok(())
    }
}
