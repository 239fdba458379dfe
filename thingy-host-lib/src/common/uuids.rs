use uuid::{uuid, Uuid};

// Thingy:52 vendor base ef68xxxx-9b35-4933-9b10-52ffa9740042

pub const UIS_LED_UUID: Uuid = uuid!("ef680301-9b35-4933-9b10-52ffa9740042");

pub const TMS_CONF_UUID: Uuid = uuid!("ef680401-9b35-4933-9b10-52ffa9740042");
pub const TMS_RAW_DATA_UUID: Uuid = uuid!("ef680406-9b35-4933-9b10-52ffa9740042");
