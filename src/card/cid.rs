use crate::regs::words_to_reg;

crate::register_fields! {
    SD_CID_MANUFACTURER_ID: [127:120];
    SD_CID_APPLICATION_ID: [119:104];
    SD_CID_PRODUCT_NAME: [103:64];
    SD_CID_PRODUCT_VERSION: [63:56];
    SD_CID_SERIAL_NUMBER: [55:24];
    SD_CID_MANUFACTURING_DATE: [19:8];

    MMC_CID_MANUFACTURER_ID: [127:120];
    /// Device/BGA, eMMC only.
    MMC_CID_DEVICE_TYPE: [113:112];
    MMC_CID_APPLICATION_ID: [111:104];
    MMC_CID_PRODUCT_NAME: [103:56];
    MMC_CID_PRODUCT_VERSION: [55:48];
    MMC_CID_SERIAL_NUMBER: [47:16];
    MMC_CID_MANUFACTURING_DATE: [15:8];
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SdCid {
    pub manufacturer_id: u8,
    pub application_id: u16,
    pub product_name: [u8; 5],
    pub product_version: u8,
    pub serial_number: u32,
    /// Year offset from 2000 in bits 11:4, month in bits 3:0.
    pub manufacturing_data: u16,
}

impl SdCid {
    pub fn decode(raw: &[u32; 4]) -> Self {
        let reg = words_to_reg(raw);
        SdCid {
            manufacturer_id: SD_CID_MANUFACTURER_ID.read(reg) as u8,
            application_id: SD_CID_APPLICATION_ID.read(reg) as u16,
            product_name: SD_CID_PRODUCT_NAME.read_bytes(reg),
            product_version: SD_CID_PRODUCT_VERSION.read(reg) as u8,
            serial_number: SD_CID_SERIAL_NUMBER.read(reg),
            manufacturing_data: SD_CID_MANUFACTURING_DATE.read(reg) as u16,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MmcCid {
    pub manufacturer_id: u8,
    pub device_type: u8,
    pub application_id: u8,
    pub product_name: [u8; 6],
    pub product_version: u8,
    pub serial_number: u32,
    /// Month in bits 7:4, year offset in bits 3:0.
    pub manufacturing_data: u8,
}

impl MmcCid {
    pub fn decode(raw: &[u32; 4]) -> Self {
        let reg = words_to_reg(raw);
        MmcCid {
            manufacturer_id: MMC_CID_MANUFACTURER_ID.read(reg) as u8,
            device_type: MMC_CID_DEVICE_TYPE.read(reg) as u8,
            application_id: MMC_CID_APPLICATION_ID.read(reg) as u8,
            product_name: MMC_CID_PRODUCT_NAME.read_bytes(reg),
            product_version: MMC_CID_PRODUCT_VERSION.read(reg) as u8,
            serial_number: MMC_CID_SERIAL_NUMBER.read(reg),
            manufacturing_data: MMC_CID_MANUFACTURING_DATE.read(reg) as u8,
        }
    }
}
